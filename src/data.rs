use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::errors::RepackError;

pub use crate::types::{FieldName, SampleKey};

/// Insertion-ordered field map so entry order is deterministic end-to-end.
pub type FieldMap = IndexMap<FieldName, Vec<u8>>;

/// Policy for a field name supplied by both sides of a join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Fail the run; partition field sets are expected to be disjoint.
    #[default]
    Reject,
    /// Let the partition payload replace the feature payload.
    Overwrite,
}

/// One sample's keyed bundle of named byte payloads.
///
/// Keys are unique within a single archive; field payloads are opaque to the
/// pipeline (structural merge only, no content transformation).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Sample key shared across input archives.
    pub key: SampleKey,
    /// Named byte payloads in archive entry order.
    pub fields: FieldMap,
}

impl Record {
    /// Create an empty record for `key`.
    pub fn new(key: impl Into<SampleKey>) -> Self {
        Self {
            key: key.into(),
            fields: FieldMap::new(),
        }
    }

    /// Create a record with prebuilt fields.
    pub fn with_fields(key: impl Into<SampleKey>, fields: FieldMap) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }

    /// Add one field payload, keeping insertion order.
    pub fn insert_field(&mut self, name: impl Into<FieldName>, payload: Vec<u8>) {
        self.fields.insert(name.into(), payload);
    }

    /// Fold `other`'s fields into this record under `policy`.
    pub fn merge_from(
        &mut self,
        other: Record,
        policy: CollisionPolicy,
    ) -> Result<(), RepackError> {
        for (field, payload) in other.fields {
            match self.fields.entry(field) {
                Entry::Occupied(mut slot) => match policy {
                    CollisionPolicy::Reject => {
                        return Err(RepackError::FieldCollision {
                            key: self.key.clone(),
                            field: slot.key().clone(),
                        });
                    }
                    CollisionPolicy::Overwrite => {
                        slot.insert(payload);
                    }
                },
                Entry::Vacant(slot) => {
                    slot.insert(payload);
                }
            }
        }
        Ok(())
    }
}
