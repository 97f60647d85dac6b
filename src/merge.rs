//! Keyed merge engine.
//!
//! Two pull-based strategies over [`ArchiveCursor`]s, both yielding one
//! record at a time with no buffered output beyond the current item:
//! - [`JoinMerge`]: synchronized exact-match join of a feature archive with
//!   N disjoint partition archives (partition keys must track feature order).
//! - [`OrderedMerge`]: k-way merge of partition archives alone into one
//!   globally key-ascending stream, comparing keys as unsigned integers.

use crate::cursor::ArchiveCursor;
use crate::data::{CollisionPolicy, Record};
use crate::errors::RepackError;

/// Synchronized exact-match join (one feature cursor, N partition cursors).
///
/// For each feature record exactly one partition head must carry the same
/// key; that partition's fields are folded into the feature record. Only the
/// current head of each partition is ever inspected, so partitions must
/// expose keys in the same relative order as the feature archive.
pub struct JoinMerge<'a> {
    features: ArchiveCursor<'a>,
    partitions: Vec<ArchiveCursor<'a>>,
    collision: CollisionPolicy,
    done: bool,
}

impl<'a> JoinMerge<'a> {
    /// Build a join over `features` and `partitions` (registration order is
    /// only used for diagnostics here; matching is by key).
    pub fn new(
        features: ArchiveCursor<'a>,
        partitions: Vec<ArchiveCursor<'a>>,
        collision: CollisionPolicy,
    ) -> Self {
        Self {
            features,
            partitions,
            collision,
            done: false,
        }
    }

    fn next_merged(&mut self) -> Result<Option<Record>, RepackError> {
        let Some(mut merged) = self.features.advance()? else {
            // End of the feature archive: every partition must be drained.
            for cursor in &self.partitions {
                if let Some(residual) = cursor.peek() {
                    return Err(RepackError::ResidualPartition {
                        archive: cursor.archive().to_string(),
                        key: residual.key.clone(),
                    });
                }
            }
            return Ok(None);
        };

        let hits: Vec<usize> = self
            .partitions
            .iter()
            .enumerate()
            .filter(|(_, cursor)| {
                cursor
                    .peek()
                    .is_some_and(|record| record.key == merged.key)
            })
            .map(|(idx, _)| idx)
            .collect();
        let [hit] = hits.as_slice() else {
            return Err(RepackError::MatchCount {
                key: merged.key,
                matches: hits.len(),
            });
        };

        if let Some(partition_record) = self.partitions[*hit].advance()? {
            merged.merge_from(partition_record, self.collision)?;
        }
        Ok(Some(merged))
    }
}

impl Iterator for JoinMerge<'_> {
    type Item = Result<Record, RepackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_merged() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// K-way numeric merge of partition cursors into one ascending stream.
///
/// Keys compare as unsigned integers (`"002"` sorts before `"010"`). An
/// equal numeric key across streams is won by the first-registered cursor.
pub struct OrderedMerge<'a> {
    cursors: Vec<ArchiveCursor<'a>>,
    done: bool,
}

impl<'a> OrderedMerge<'a> {
    /// Build a merge over `cursors` in tie-break registration order.
    pub fn new(cursors: Vec<ArchiveCursor<'a>>) -> Self {
        Self {
            cursors,
            done: false,
        }
    }

    fn next_ordered(&mut self) -> Result<Option<Record>, RepackError> {
        let mut lowest: Option<(usize, u64)> = None;
        for (idx, cursor) in self.cursors.iter().enumerate() {
            let Some(record) = cursor.peek() else {
                continue;
            };
            let key = numeric_key(cursor, record)?;
            // Strict comparison keeps the earlier cursor on ties.
            let better = match lowest {
                None => true,
                Some((_, best)) => key < best,
            };
            if better {
                lowest = Some((idx, key));
            }
        }
        match lowest {
            Some((idx, _)) => self.cursors[idx].advance(),
            None => Ok(None),
        }
    }
}

impl Iterator for OrderedMerge<'_> {
    type Item = Result<Record, RepackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_ordered() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn numeric_key(cursor: &ArchiveCursor<'_>, record: &Record) -> Result<u64, RepackError> {
    record
        .key
        .parse::<u64>()
        .map_err(|_| RepackError::Archive {
            archive: cursor.archive().to_string(),
            reason: format!("sample key '{}' is not an unsigned integer", record.key),
        })
}
