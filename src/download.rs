//! Download collaborator.
//!
//! Fetches the remote distribution files the pipeline consumes and verifies
//! their md5 digests before they are moved into place. The core never sees a
//! file this module has not finished verifying.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::constants::download::{COPY_BUFFER_BYTES, PART_EXTENSION, PROGRESS_INTERVAL_SECS};
use crate::errors::RepackError;
use crate::manifest::Manifest;

/// Fetch every manifest file into `dest_dir`, verifying checksums.
///
/// Returns the local paths in manifest order.
pub fn fetch_manifest(manifest: &Manifest, dest_dir: &Path) -> Result<Vec<PathBuf>, RepackError> {
    fs::create_dir_all(dest_dir)?;
    let mut fetched = Vec::with_capacity(manifest.files().count());
    for file in manifest.files() {
        let target = dest_dir.join(&file.name);
        fetch_file(&file.url, &target, &file.md5)?;
        fetched.push(target);
    }
    Ok(fetched)
}

/// Download `url` to `target` unless it already exists.
///
/// The payload streams into a `.part` sibling while an md5 digest is folded
/// in; the digest must start with `md5_prefix` before the file is renamed
/// into place, so `target` never holds unverified bytes.
pub fn fetch_file(url: &str, target: &Path, md5_prefix: &str) -> Result<(), RepackError> {
    if target.exists() {
        info!("[shardpack:fetch] already downloaded: {}", target.display());
        return Ok(());
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let part = target.with_extension(PART_EXTENSION);
    if part.exists() {
        warn!(
            "[shardpack:fetch] removing stale partial download: {}",
            part.display()
        );
        let _ = fs::remove_file(&part);
    }

    let response = ureq::get(url)
        .call()
        .map_err(|err| RepackError::Download {
            url: url.to_string(),
            reason: format!("request failed: {err}"),
        })?;
    let expected_bytes = response
        .headers()
        .get("content-length")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let mut reader = response.into_body().into_reader();

    info!("[shardpack:fetch] downloading {} -> {}", url, target.display());
    let mut file = File::create(&part)?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; COPY_BUFFER_BYTES];
    let started = Instant::now();
    let mut last_report = started;
    let mut total_bytes = 0u64;
    loop {
        let read = reader.read(&mut buffer).map_err(|err| RepackError::Download {
            url: url.to_string(),
            reason: format!("stream read failed: {err}"),
        })?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])?;
        context.consume(&buffer[..read]);
        total_bytes = total_bytes.saturating_add(read as u64);
        if last_report.elapsed() >= Duration::from_secs(PROGRESS_INTERVAL_SECS) {
            report_progress(target, total_bytes, expected_bytes, started.elapsed());
            last_report = Instant::now();
        }
    }
    file.sync_all()?;
    drop(file);

    let digest = format!("{:x}", context.compute());
    if !digest.starts_with(md5_prefix) {
        let _ = fs::remove_file(&part);
        return Err(RepackError::Download {
            url: url.to_string(),
            reason: format!("checksum mismatch: expected '{md5_prefix}', got '{digest}'"),
        });
    }
    fs::rename(&part, target)?;
    info!(
        "[shardpack:fetch] done {}: {:.1} MiB in {:.1}s",
        target.display(),
        total_bytes as f64 / (1024.0 * 1024.0),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn report_progress(target: &Path, total_bytes: u64, expected_bytes: Option<u64>, elapsed: Duration) {
    let elapsed_secs = elapsed.as_secs_f64();
    if let Some(expected) = expected_bytes
        && expected > 0
    {
        let pct = ((total_bytes as f64 / expected as f64) * 100.0).clamp(0.0, 100.0);
        info!(
            "[shardpack:fetch] progress {}: {:.1}/{:.1} MiB ({:.1}%, {:.1}s elapsed)",
            target.display(),
            total_bytes as f64 / (1024.0 * 1024.0),
            expected as f64 / (1024.0 * 1024.0),
            pct,
            elapsed_secs
        );
    } else {
        info!(
            "[shardpack:fetch] progress {}: {:.1} MiB ({:.1}s elapsed)",
            target.display(),
            total_bytes as f64 / (1024.0 * 1024.0),
            elapsed_secs
        );
    }
}
