use std::path::PathBuf;

use crate::constants::shards::{DEFAULT_MAX_SHARD_BYTES, DEFAULT_MAX_SHARD_RECORDS};
use crate::data::CollisionPolicy;
use crate::errors::RepackError;

/// Merge strategy selecting how the input archives combine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// Synchronized exact-match join of a feature archive with its partitions.
    Join,
    /// K-way numeric-key merge of the partition archives alone.
    Ordered,
}

/// Top-level repack run configuration.
#[derive(Clone, Debug)]
pub struct PackConfig {
    /// Merge strategy for this run.
    pub mode: MergeMode,
    /// Feature archive path; required in `Join` mode, rejected in `Ordered`.
    pub features: Option<PathBuf>,
    /// Partition archive paths, registered in tie-break order.
    pub partitions: Vec<PathBuf>,
    /// Metadata JSON mapping sample keys to split labels.
    pub metadata: PathBuf,
    /// Output root; shards land under per-split subdirectories.
    pub out_root: PathBuf,
    /// Byte ceiling per output shard.
    pub max_shard_bytes: u64,
    /// Record ceiling per output shard.
    pub max_shard_records: u64,
    /// Policy when a field arrives from both sides of a join.
    pub collision: CollisionPolicy,
}

impl PackConfig {
    /// Create a configuration with default ceilings and collision policy.
    pub fn new(mode: MergeMode, metadata: impl Into<PathBuf>, out_root: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            features: None,
            partitions: Vec::new(),
            metadata: metadata.into(),
            out_root: out_root.into(),
            max_shard_bytes: DEFAULT_MAX_SHARD_BYTES,
            max_shard_records: DEFAULT_MAX_SHARD_RECORDS,
            collision: CollisionPolicy::default(),
        }
    }

    /// Validate the configuration before any output is created.
    pub fn validate(&self) -> Result<(), RepackError> {
        if self.partitions.is_empty() {
            return Err(RepackError::Configuration(
                "at least one partition archive is required".to_string(),
            ));
        }
        if self.mode == MergeMode::Join && self.features.is_none() {
            return Err(RepackError::Configuration(
                "join mode requires a feature archive".to_string(),
            ));
        }
        if self.mode == MergeMode::Ordered && self.features.is_some() {
            return Err(RepackError::Configuration(
                "ordered mode takes no feature archive".to_string(),
            ));
        }
        if self.max_shard_bytes == 0 || self.max_shard_records == 0 {
            return Err(RepackError::Configuration(
                "shard ceilings must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(mode: MergeMode) -> PackConfig {
        let mut config = PackConfig::new(mode, "metadata.json", "out");
        config.partitions = vec![PathBuf::from("part.tar")];
        config
    }

    #[test]
    fn join_requires_a_feature_archive() {
        let mut config = base(MergeMode::Join);
        assert!(config.validate().is_err());
        config.features = Some(PathBuf::from("features.tar"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ordered_rejects_a_feature_archive() {
        let mut config = base(MergeMode::Ordered);
        assert!(config.validate().is_ok());
        config.features = Some(PathBuf::from("features.tar"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn ceilings_must_be_positive() {
        let mut config = base(MergeMode::Ordered);
        config.max_shard_records = 0;
        assert!(config.validate().is_err());

        let mut config = base(MergeMode::Ordered);
        config.max_shard_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partitions_are_required() {
        let config = PackConfig::new(MergeMode::Ordered, "metadata.json", "out");
        assert!(config.validate().is_err());
    }
}
