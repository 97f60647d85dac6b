use std::fs::{self, File};
use std::path::PathBuf;

use tar::Builder;
use tracing::{debug, info};

use crate::constants::archive::TAR_FINISH_BYTES;
use crate::constants::shards::{SHARD_FILE_EXTENSION, SHARD_FILE_PREFIX, SHARD_INDEX_WIDTH};
use crate::data::Record;
use crate::errors::RepackError;
use crate::transport::tar::{append_record, record_block_size};

/// Final accounting for one sealed shard.
#[derive(Clone, Debug)]
pub struct ShardSummary {
    /// Container file path.
    pub path: PathBuf,
    /// Records written.
    pub records: u64,
    /// Accounted container bytes (entry headers plus padded payloads).
    pub bytes: u64,
}

struct OpenShard {
    builder: Builder<File>,
    path: PathBuf,
    bytes: u64,
    records: u64,
}

/// Size/count-bounded writer producing one split's numbered shard sequence.
///
/// Shards are opened on demand, sealed when the next write would breach a
/// ceiling, and sealed once more by [`ShardWriter::close`] at end-of-run.
/// The sequence restarts from `out-000000` for every run.
pub struct ShardWriter {
    split_dir: PathBuf,
    max_bytes: u64,
    max_records: u64,
    next_seq: u64,
    open: Option<OpenShard>,
    sealed: Vec<ShardSummary>,
}

impl ShardWriter {
    /// Create a writer rooted at `split_dir`, creating the directory eagerly.
    pub fn create(
        split_dir: impl Into<PathBuf>,
        max_bytes: u64,
        max_records: u64,
    ) -> Result<Self, RepackError> {
        let split_dir = split_dir.into();
        fs::create_dir_all(&split_dir)?;
        Ok(Self {
            split_dir,
            max_bytes,
            max_records,
            next_seq: 0,
            open: None,
            sealed: Vec::new(),
        })
    }

    /// Write one record, rolling over to a fresh shard when appending would
    /// breach either ceiling. A record larger than the byte ceiling still
    /// lands alone in its own shard.
    pub fn write(&mut self, record: &Record) -> Result<(), RepackError> {
        let incoming = record_block_size(record);
        if let Some(open) = &self.open {
            let over_bytes = open.bytes + incoming + TAR_FINISH_BYTES > self.max_bytes;
            let over_records = open.records + 1 > self.max_records;
            if (over_bytes || over_records) && open.records > 0 {
                self.seal()?;
            }
        }
        if self.open.is_none() {
            let path = self.shard_path(self.next_seq);
            let file = File::create(&path)?;
            debug!("[shardpack:shard] opened {}", path.display());
            self.open = Some(OpenShard {
                builder: Builder::new(file),
                path,
                bytes: 0,
                records: 0,
            });
            self.next_seq += 1;
        }
        if let Some(open) = &mut self.open {
            append_record(&mut open.builder, record)?;
            open.bytes += incoming;
            open.records += 1;
        }
        Ok(())
    }

    /// Seal whatever shard is open and flush it to durable storage.
    /// No-op when none is open; called once per split at end-of-run.
    pub fn close(&mut self) -> Result<(), RepackError> {
        self.seal()
    }

    /// Summaries of every sealed shard, in sequence order.
    pub fn sealed(&self) -> &[ShardSummary] {
        &self.sealed
    }

    /// Consume the writer, returning the sealed-shard summaries.
    pub fn into_sealed(self) -> Vec<ShardSummary> {
        self.sealed
    }

    fn seal(&mut self) -> Result<(), RepackError> {
        let Some(open) = self.open.take() else {
            return Ok(());
        };
        let OpenShard {
            mut builder,
            path,
            bytes,
            records,
        } = open;
        builder.finish()?;
        let file = builder.into_inner()?;
        file.sync_all()?;
        info!(
            "[shardpack:shard] sealed {} ({records} records, {bytes} bytes)",
            path.display()
        );
        self.sealed.push(ShardSummary {
            path,
            records,
            bytes,
        });
        Ok(())
    }

    fn shard_path(&self, seq: u64) -> PathBuf {
        self.split_dir.join(format!(
            "{SHARD_FILE_PREFIX}{seq:0width$}.{SHARD_FILE_EXTENSION}",
            width = SHARD_INDEX_WIDTH
        ))
    }
}
