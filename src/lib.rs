#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// CLI front used by the `shardpack` binary.
pub mod app;
/// Run configuration types.
pub mod config;
/// Centralized constants used across merging, sharding, and downloads.
pub mod constants;
/// Archive cursor contract and single-lookahead traversal.
pub mod cursor;
/// Record payload types.
pub mod data;
/// Download collaborator with checksum verification.
pub mod download;
/// Distribution manifest loading.
pub mod manifest;
/// Keyed merge engine (synchronized join and k-way numeric merge).
pub mod merge;
/// Split metadata table.
pub mod metadata;
/// End-to-end repack pipeline.
pub mod pipeline;
/// Split routing to bounded shard writers.
pub mod router;
/// Bounded shard writer.
pub mod shard;
/// Split labels.
pub mod splits;
/// Container transports (tar today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use config::{MergeMode, PackConfig};
pub use cursor::{ArchiveCursor, DynRecordRead, MemoryRecords, RecordRead};
pub use data::{CollisionPolicy, FieldMap, Record};
pub use errors::RepackError;
pub use manifest::{Manifest, RemoteFile};
pub use merge::{JoinMerge, OrderedMerge};
pub use metadata::SplitTable;
pub use pipeline::PackReport;
pub use router::{SplitLayout, SplitRouter};
pub use shard::{ShardSummary, ShardWriter};
pub use splits::{ALL_SPLITS, SplitLabel};
pub use types::{ArchiveId, FieldName, SampleKey};
