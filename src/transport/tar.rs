//! Tar container access.
//!
//! Input archives and output shards share one entry-name convention: every
//! record field is stored as `{key}.{field}`, and a record's entries sit
//! adjacent to each other in the container. Reading groups adjacent entries
//! back into records; writing emits one entry per field.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tar::{Archive, Builder, Entries, Header};
use tracing::debug;

use crate::constants::archive::{ENTRY_FIELD_SEPARATOR, TAR_BLOCK_BYTES};
use crate::cursor::RecordRead;
use crate::data::Record;
use crate::errors::RepackError;
use crate::types::{ArchiveId, FieldName, SampleKey};

/// One input container opened for a single forward pass.
pub struct TarArchive {
    id: ArchiveId,
    path: PathBuf,
    inner: Archive<BufReader<File>>,
}

impl TarArchive {
    /// Open `path` for sequential reading; `id` names the archive in diagnostics.
    pub fn open(id: impl Into<ArchiveId>, path: impl Into<PathBuf>) -> Result<Self, RepackError> {
        let id = id.into();
        let path = path.into();
        let file = File::open(&path).map_err(|err| RepackError::Archive {
            archive: id.clone(),
            reason: format!("cannot open {}: {err}", path.display()),
        })?;
        Ok(Self {
            id,
            path,
            inner: Archive::new(BufReader::new(file)),
        })
    }

    /// Archive id used in diagnostics.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Start the record stream. The archive is read-once; call this once.
    pub fn records(&mut self) -> Result<TarRecordReader<'_>, RepackError> {
        let entries = self.inner.entries().map_err(|err| RepackError::Archive {
            archive: self.id.clone(),
            reason: format!("{}: {err}", self.path.display()),
        })?;
        Ok(TarRecordReader {
            archive: self.id.clone(),
            entries,
            pending: None,
        })
    }
}

/// Streams records out of one tar container, grouping adjacent entries that
/// share a key stem.
pub struct TarRecordReader<'a> {
    archive: ArchiveId,
    entries: Entries<'a, BufReader<File>>,
    pending: Option<(SampleKey, FieldName, Vec<u8>)>,
}

impl TarRecordReader<'_> {
    fn read_entry(&mut self) -> Result<Option<(SampleKey, FieldName, Vec<u8>)>, RepackError> {
        while let Some(entry) = self.entries.next() {
            let mut entry = entry.map_err(|err| self.malformed(format!("{err}")))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = {
                let path = entry
                    .path()
                    .map_err(|err| self.malformed(format!("bad entry path: {err}")))?;
                match path.file_name().and_then(|name| name.to_str()) {
                    Some(name) => name.to_string(),
                    None => {
                        debug!("[shardpack:tar] skipping entry with unusable name");
                        continue;
                    }
                }
            };
            let Some((key, field)) = split_entry_name(&name) else {
                debug!("[shardpack:tar] skipping entry without field suffix: {name}");
                continue;
            };
            let mut payload = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut payload)
                .map_err(|err| self.malformed(format!("entry '{name}': {err}")))?;
            return Ok(Some((key, field, payload)));
        }
        Ok(None)
    }

    fn malformed(&self, reason: String) -> RepackError {
        RepackError::Archive {
            archive: self.archive.clone(),
            reason,
        }
    }
}

impl RecordRead for TarRecordReader<'_> {
    fn next_record(&mut self) -> Result<Option<Record>, RepackError> {
        let (key, field, payload) = match self.pending.take() {
            Some(buffered) => buffered,
            None => match self.read_entry()? {
                Some(entry) => entry,
                None => return Ok(None),
            },
        };
        let mut record = Record::new(key);
        record.insert_field(field, payload);
        loop {
            match self.read_entry()? {
                Some((key, field, payload)) if key == record.key => {
                    record.insert_field(field, payload);
                }
                Some(next) => {
                    self.pending = Some(next);
                    break;
                }
                None => break,
            }
        }
        Ok(Some(record))
    }
}

/// Split `0001234.image.png` into (`0001234`, `image.png`).
///
/// Returns `None` for names without a field suffix; such entries carry no
/// record data under the naming convention and are skipped by the reader.
pub fn split_entry_name(name: &str) -> Option<(SampleKey, FieldName)> {
    let (key, field) = name.split_once(ENTRY_FIELD_SEPARATOR)?;
    if key.is_empty() || field.is_empty() {
        return None;
    }
    Some((key.to_string(), field.to_string()))
}

/// Bytes one record occupies inside a tar container (headers plus payloads
/// padded to block granularity).
pub fn record_block_size(record: &Record) -> u64 {
    record
        .fields
        .values()
        .map(|payload| entry_block_size(payload.len() as u64))
        .sum()
}

fn entry_block_size(payload_len: u64) -> u64 {
    TAR_BLOCK_BYTES + payload_len.div_ceil(TAR_BLOCK_BYTES) * TAR_BLOCK_BYTES
}

/// Append one record to an open builder, one entry per field.
pub fn append_record<W: Write>(
    builder: &mut Builder<W>,
    record: &Record,
) -> Result<(), RepackError> {
    for (field, payload) in &record.fields {
        let mut header = Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        let name = format!("{}{}{}", record.key, ENTRY_FIELD_SEPARATOR, field);
        builder.append_data(&mut header, &name, payload.as_slice())?;
    }
    Ok(())
}

/// Read every record out of a container, in layout order.
///
/// Convenience for callers that inspect whole shards (reports, tests); the
/// pipeline itself streams through [`TarArchive::records`].
pub fn read_all_records(path: &Path) -> Result<Vec<Record>, RepackError> {
    let id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("archive")
        .to_string();
    let mut archive = TarArchive::open(id, path)?;
    let mut reader = archive.records()?;
    let mut records = Vec::new();
    while let Some(record) = reader.next_record()? {
        records.push(record);
    }
    Ok(records)
}
