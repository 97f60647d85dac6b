use std::io;

use thiserror::Error;

use crate::types::{ArchiveId, FieldName, SampleKey};

/// Error type for merge integrity, configuration, IO, and download failures.
///
/// Every variant is fatal: input archives are assumed complete and verified,
/// so any deviation is an unrecoverable precondition violation and the run
/// aborts at the first failure.
#[derive(Debug, Error)]
pub enum RepackError {
    #[error("sample '{key}' matched {matches} partition heads, expected exactly 1")]
    MatchCount { key: SampleKey, matches: usize },
    #[error(
        "partition '{archive}' still holds sample '{key}' after the feature archive was exhausted"
    )]
    ResidualPartition { archive: ArchiveId, key: SampleKey },
    #[error("sample '{key}' received field '{field}' from two archives")]
    FieldCollision { key: SampleKey, field: FieldName },
    #[error("sample '{key}' has no split assignment in the metadata table")]
    MissingSplit { key: SampleKey },
    #[error("archive '{archive}' is malformed: {reason}")]
    Archive { archive: ArchiveId, reason: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("download of '{url}' failed: {reason}")]
    Download { url: String, reason: String },
}
