use std::path::Path;

use indexmap::IndexMap;

use crate::constants::splits::ALL_SPLITS;
use crate::data::Record;
use crate::errors::RepackError;
use crate::metadata::SplitTable;
use crate::shard::{ShardSummary, ShardWriter};
use crate::splits::SplitLabel;

/// One split's sealed shard sequence, reported at end-of-run.
#[derive(Debug)]
pub struct SplitLayout {
    /// Split the shards belong to.
    pub split: SplitLabel,
    /// Sealed shards in sequence order.
    pub shards: Vec<ShardSummary>,
}

impl SplitLayout {
    /// Total records across this split's shards.
    pub fn records(&self) -> u64 {
        self.shards.iter().map(|shard| shard.records).sum()
    }
}

/// Routes merged records to per-split bounded writers via the metadata table.
///
/// Holds no state of its own beyond the table reference and the writers; a
/// record's destination is determined solely by its key's table entry.
pub struct SplitRouter {
    table: SplitTable,
    writers: IndexMap<SplitLabel, ShardWriter>,
}

impl SplitRouter {
    /// Create one writer per split label under `out_root/<split>/`.
    pub fn create(
        out_root: &Path,
        table: SplitTable,
        max_bytes: u64,
        max_records: u64,
    ) -> Result<Self, RepackError> {
        let mut writers = IndexMap::new();
        for split in ALL_SPLITS {
            let writer = ShardWriter::create(out_root.join(split.as_str()), max_bytes, max_records)?;
            writers.insert(split, writer);
        }
        Ok(Self { table, writers })
    }

    /// Split assignment for `record`, straight from the metadata table.
    pub fn route(&self, record: &Record) -> Result<SplitLabel, RepackError> {
        self.table.split_for(&record.key)
    }

    /// Route one record and write it to the matching split's shard sequence.
    pub fn dispatch(&mut self, record: &Record) -> Result<SplitLabel, RepackError> {
        let split = self.route(record)?;
        match self.writers.get_mut(&split) {
            Some(writer) => writer.write(record)?,
            None => {
                return Err(RepackError::Configuration(format!(
                    "no shard writer registered for split '{split}'"
                )));
            }
        }
        Ok(split)
    }

    /// Seal every writer exactly once and return the final per-split layout.
    pub fn close(self) -> Result<Vec<SplitLayout>, RepackError> {
        let mut layouts = Vec::with_capacity(self.writers.len());
        for (split, mut writer) in self.writers {
            writer.close()?;
            layouts.push(SplitLayout {
                split,
                shards: writer.into_sealed(),
            });
        }
        Ok(layouts)
    }
}
