//! Archive traversal contract.
//!
//! Ownership model:
//! - `RecordRead` is the narrow, forward-only stream a container backend
//!   exposes; it never seeks and buffers nothing itself.
//! - `ArchiveCursor` owns one boxed stream plus a single lookahead record and
//!   is consumed monotonically by the merge engine until exhausted.

use crate::data::Record;
use crate::errors::RepackError;
use crate::types::ArchiveId;

/// Forward-only record stream over one input archive.
///
/// Implementations yield records in archive layout order. A read fault is
/// fatal and must not be retried; the input file is assumed complete and
/// immutable for the run.
pub trait RecordRead {
    /// Read the next record, or `None` once the archive is exhausted.
    fn next_record(&mut self) -> Result<Option<Record>, RepackError>;
}

/// Boxed record stream whose lifetime is tied to the archive it reads.
pub type DynRecordRead<'a> = Box<dyn RecordRead + 'a>;

/// Single-lookahead cursor over one archive.
pub struct ArchiveCursor<'a> {
    archive: ArchiveId,
    source: DynRecordRead<'a>,
    head: Option<Record>,
}

impl<'a> ArchiveCursor<'a> {
    /// Open a cursor over `source`, loading the first record.
    pub fn new(
        archive: impl Into<ArchiveId>,
        mut source: DynRecordRead<'a>,
    ) -> Result<Self, RepackError> {
        let head = source.next_record()?;
        Ok(Self {
            archive: archive.into(),
            source,
            head,
        })
    }

    /// Archive id used in diagnostics.
    pub fn archive(&self) -> &str {
        &self.archive
    }

    /// The next unconsumed record, without advancing.
    pub fn peek(&self) -> Option<&Record> {
        self.head.as_ref()
    }

    /// Consume the buffered record and load the next one from the archive.
    ///
    /// Returns the consumed record, or `None` when already exhausted.
    pub fn advance(&mut self) -> Result<Option<Record>, RepackError> {
        let consumed = self.head.take();
        if consumed.is_some() {
            self.head = self.source.next_record()?;
        }
        Ok(consumed)
    }

    /// True once `peek` would return nothing.
    pub fn is_exhausted(&self) -> bool {
        self.head.is_none()
    }
}

/// In-memory record stream for tests and small inputs.
pub struct MemoryRecords {
    records: std::vec::IntoIter<Record>,
}

impl MemoryRecords {
    /// Create a stream from prebuilt records in emission order.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

impl RecordRead for MemoryRecords {
    fn next_record(&mut self) -> Result<Option<Record>, RepackError> {
        Ok(self.records.next())
    }
}
