use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::RepackError;

/// One remote file in the distribution manifest.
#[derive(Clone, Debug, Deserialize)]
pub struct RemoteFile {
    /// Local file name the download materializes under the destination dir.
    pub name: String,
    /// Source URL.
    pub url: String,
    /// Expected md5 digest, lowercase hex; a prefix is accepted.
    pub md5: String,
}

/// Remote distribution description driving the fetch step.
///
/// The fetch collaborator downloads and verifies every listed file; the core
/// pipeline then assumes those files are complete and immutable.
#[derive(Clone, Debug, Deserialize)]
pub struct Manifest {
    /// Split metadata file.
    pub metadata: RemoteFile,
    /// Feature archive; absent for partition-only distributions.
    #[serde(default)]
    pub features: Option<RemoteFile>,
    /// Partition archives in registration order.
    pub partitions: Vec<RemoteFile>,
}

impl Manifest {
    /// Load a manifest JSON document.
    pub fn load(path: &Path) -> Result<Self, RepackError> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|err| {
            RepackError::Configuration(format!("manifest file {}: {err}", path.display()))
        })
    }

    /// Every file to fetch: metadata first, then features, then partitions.
    pub fn files(&self) -> impl Iterator<Item = &RemoteFile> {
        std::iter::once(&self.metadata)
            .chain(self.features.iter())
            .chain(self.partitions.iter())
    }
}
