use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::RepackError;
use crate::splits::SplitLabel;
use crate::types::SampleKey;

/// Per-sample entry in the metadata file. Sibling fields are ignored.
#[derive(Debug, Deserialize)]
struct SampleMeta {
    category: String,
}

/// Immutable key-to-split assignment table, loaded once before merging begins
/// and read-only for the remainder of the run.
#[derive(Debug)]
pub struct SplitTable {
    entries: HashMap<SampleKey, SplitLabel>,
}

impl SplitTable {
    /// Load a metadata JSON object mapping each key to a `category` split label.
    ///
    /// An unrecognized label fails here, before any shard is opened.
    pub fn load(path: &Path) -> Result<Self, RepackError> {
        let raw = fs::read_to_string(path)?;
        let parsed: HashMap<SampleKey, SampleMeta> =
            serde_json::from_str(&raw).map_err(|err| {
                RepackError::Configuration(format!("metadata file {}: {err}", path.display()))
            })?;

        let mut entries = HashMap::with_capacity(parsed.len());
        for (key, meta) in parsed {
            let label = SplitLabel::parse(&meta.category).ok_or_else(|| {
                RepackError::Configuration(format!(
                    "metadata file {}: sample '{key}' has unrecognized split label '{}'",
                    path.display(),
                    meta.category
                ))
            })?;
            entries.insert(key, label);
        }
        Ok(Self { entries })
    }

    /// Build a table from prebuilt assignments.
    pub fn from_entries(entries: HashMap<SampleKey, SplitLabel>) -> Self {
        Self { entries }
    }

    /// Split assignment for `key`; missing keys are an integrity failure.
    pub fn split_for(&self, key: &str) -> Result<SplitLabel, RepackError> {
        self.entries
            .get(key)
            .copied()
            .ok_or_else(|| RepackError::MissingSplit {
                key: key.to_string(),
            })
    }

    /// Number of assigned keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table holds no assignments.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
