//! End-to-end repack run.
//!
//! Wires archive cursors into the merge engine, routes each merged record to
//! its split, and seals every shard writer at end-of-run. Entirely pull-based
//! and single-threaded: the engine drives cursor advancement, and the run
//! either completes or aborts on the first integrity/IO failure.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::{MergeMode, PackConfig};
use crate::constants::pipeline::PROGRESS_INTERVAL_SECS;
use crate::cursor::ArchiveCursor;
use crate::data::Record;
use crate::errors::RepackError;
use crate::merge::{JoinMerge, OrderedMerge};
use crate::metadata::SplitTable;
use crate::router::{SplitLayout, SplitRouter};
use crate::transport::tar::TarArchive;

/// Result of a completed repack run.
#[derive(Debug)]
pub struct PackReport {
    /// Records written across all splits.
    pub records: u64,
    /// Sealed shard layout per split.
    pub layouts: Vec<SplitLayout>,
}

/// Run the merge/repack pipeline described by `config`.
pub fn run(config: &PackConfig) -> Result<PackReport, RepackError> {
    config.validate()?;

    let table = SplitTable::load(&config.metadata)?;
    info!(
        "[shardpack:pack] loaded split assignments for {} samples",
        table.len()
    );
    let mut router = SplitRouter::create(
        &config.out_root,
        table,
        config.max_shard_bytes,
        config.max_shard_records,
    )?;

    let mut partition_archives = Vec::with_capacity(config.partitions.len());
    for path in &config.partitions {
        partition_archives.push(TarArchive::open(archive_id(path), path)?);
    }
    let mut partitions = Vec::with_capacity(partition_archives.len());
    for archive in partition_archives.iter_mut() {
        let id = archive.id().to_string();
        partitions.push(ArchiveCursor::new(id, Box::new(archive.records()?))?);
    }

    let records = match config.mode {
        MergeMode::Join => {
            let Some(features_path) = &config.features else {
                return Err(RepackError::Configuration(
                    "join mode requires a feature archive".to_string(),
                ));
            };
            let mut features_archive = TarArchive::open(archive_id(features_path), features_path)?;
            let id = features_archive.id().to_string();
            let features = ArchiveCursor::new(id, Box::new(features_archive.records()?))?;
            let engine = JoinMerge::new(features, partitions, config.collision);
            drain(engine, &mut router)?
        }
        MergeMode::Ordered => {
            let engine = OrderedMerge::new(partitions);
            drain(engine, &mut router)?
        }
    };

    let layouts = router.close()?;
    info!("[shardpack:pack] run complete: {records} records repacked");
    Ok(PackReport { records, layouts })
}

fn drain(
    engine: impl Iterator<Item = Result<Record, RepackError>>,
    router: &mut SplitRouter,
) -> Result<u64, RepackError> {
    let started = Instant::now();
    let mut last_report = started;
    let mut written = 0u64;
    for item in engine {
        let record = item?;
        router.dispatch(&record)?;
        written += 1;
        if last_report.elapsed() >= Duration::from_secs(PROGRESS_INTERVAL_SECS) {
            info!(
                "[shardpack:pack] {} records repacked ({:.1}s elapsed)",
                written,
                started.elapsed().as_secs_f64()
            );
            last_report = Instant::now();
        }
    }
    Ok(written)
}

fn archive_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("archive")
        .to_string()
}
