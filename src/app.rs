//! CLI front used by the `shardpack` binary.

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, error::ErrorKind};
use walkdir::WalkDir;

use crate::config::{MergeMode, PackConfig};
use crate::constants::shards::{DEFAULT_MAX_SHARD_BYTES, DEFAULT_MAX_SHARD_RECORDS};
use crate::data::CollisionPolicy;
use crate::download::fetch_manifest;
use crate::manifest::Manifest;
use crate::pipeline;
use crate::router::SplitLayout;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Join a feature archive with its partition archives.
    Join,
    /// Concatenate partition archives in global key order.
    Ordered,
}

impl From<ModeArg> for MergeMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Join => MergeMode::Join,
            ModeArg::Ordered => MergeMode::Ordered,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CollisionArg {
    Reject,
    Overwrite,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(value: CollisionArg) -> Self {
        match value {
            CollisionArg::Reject => CollisionPolicy::Reject,
            CollisionArg::Overwrite => CollisionPolicy::Overwrite,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "shardpack",
    disable_help_subcommand = true,
    about = "Repack keyed sample archives into split-routed bounded shards",
    long_about = "Merge independently produced sample archives (a feature archive plus \
disjoint partition archives) into sequentially numbered, size-bounded output shards, \
routed per sample to its split via a metadata table."
)]
struct ShardpackCli {
    #[command(subcommand)]
    command: ShardpackCommand,
}

#[derive(Debug, Subcommand)]
enum ShardpackCommand {
    /// Download and verify the files listed in a distribution manifest.
    Fetch(FetchArgs),
    /// Merge input archives and write split-routed bounded shards.
    Pack(PackArgs),
}

#[derive(Debug, Args)]
struct FetchArgs {
    #[arg(
        long,
        value_name = "PATH",
        help = "Distribution manifest listing urls and md5 checksums"
    )]
    manifest: PathBuf,
    #[arg(long, value_name = "DIR", help = "Directory downloads are materialized into")]
    dest: PathBuf,
}

#[derive(Debug, Args)]
struct PackArgs {
    #[arg(long, value_enum, help = "Merge strategy")]
    mode: ModeArg,
    #[arg(
        long,
        value_name = "PATH",
        help = "Feature archive holding the full payload per sample (join mode only)"
    )]
    features: Option<PathBuf>,
    #[arg(
        long = "partition",
        value_name = "PATH",
        help = "Partition archive, repeat in registration order"
    )]
    partitions: Vec<PathBuf>,
    #[arg(
        long = "partitions-dir",
        value_name = "DIR",
        help = "Scan a directory for partition archives, appended in name order"
    )]
    partitions_dir: Option<PathBuf>,
    #[arg(
        long,
        value_name = "PATH",
        help = "Metadata JSON mapping sample keys to split labels"
    )]
    metadata: PathBuf,
    #[arg(
        long,
        value_name = "DIR",
        help = "Output root; shards are written under per-split directories"
    )]
    out: PathBuf,
    #[arg(
        long = "max-shard-bytes",
        default_value_t = DEFAULT_MAX_SHARD_BYTES,
        value_parser = parse_positive_u64,
        help = "Byte ceiling per output shard"
    )]
    max_shard_bytes: u64,
    #[arg(
        long = "max-shard-records",
        default_value_t = DEFAULT_MAX_SHARD_RECORDS,
        value_parser = parse_positive_u64,
        help = "Record ceiling per output shard"
    )]
    max_shard_records: u64,
    #[arg(
        long,
        value_enum,
        default_value = "reject",
        help = "Policy when a field arrives from both sides of a join"
    )]
    collision: CollisionArg,
}

/// Run the `shardpack` CLI over `args_iter` (including the program name).
pub fn run_cli<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<ShardpackCli, _>(args_iter)? else {
        return Ok(());
    };

    match cli.command {
        ShardpackCommand::Fetch(args) => run_fetch(args),
        ShardpackCommand::Pack(args) => run_pack(args),
    }
}

fn run_fetch(args: FetchArgs) -> Result<(), Box<dyn Error>> {
    let manifest = Manifest::load(&args.manifest)?;
    let fetched = fetch_manifest(&manifest, &args.dest)?;
    println!("Fetched {} files into {}", fetched.len(), args.dest.display());
    for path in fetched {
        println!("  {}", path.display());
    }
    Ok(())
}

fn run_pack(args: PackArgs) -> Result<(), Box<dyn Error>> {
    let mut config = PackConfig::new(args.mode.into(), args.metadata, args.out);
    config.features = args.features;
    config.partitions = resolve_partitions(args.partitions, args.partitions_dir);
    config.max_shard_bytes = args.max_shard_bytes;
    config.max_shard_records = args.max_shard_records;
    config.collision = args.collision.into();

    let report = pipeline::run(&config)?;

    println!(
        "Repacked {} records into {}",
        report.records,
        config.out_root.display()
    );
    for layout in &report.layouts {
        print_layout(layout);
    }
    Ok(())
}

fn print_layout(layout: &SplitLayout) {
    println!(
        "{}: {} shards, {} records",
        layout.split,
        layout.shards.len(),
        layout.records()
    );
    for shard in &layout.shards {
        println!(
            "  {} ({} records, {} bytes)",
            shard.path.display(),
            shard.records,
            shard.bytes
        );
    }
}

/// Explicit partitions first, then any `.tar` files under `dir` in name order.
fn resolve_partitions(explicit: Vec<PathBuf>, dir: Option<PathBuf>) -> Vec<PathBuf> {
    let mut partitions = explicit;
    if let Some(dir) = dir {
        let mut scanned: Vec<PathBuf> = WalkDir::new(&dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path().to_path_buf())
            .filter(is_tar_file)
            .collect();
        scanned.sort();
        partitions.extend(scanned);
    }
    partitions
}

fn is_tar_file(path: &PathBuf) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("tar"))
        .unwrap_or(false)
}

fn parse_positive_u64(raw: &str) -> Result<u64, String> {
    let parsed = raw
        .parse::<u64>()
        .map_err(|_| format!("could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn partitions_dir_is_scanned_in_name_order_after_explicit_args() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("b.tar"), b"").unwrap();
        fs::write(temp.path().join("a.tar"), b"").unwrap();
        fs::write(temp.path().join("notes.txt"), b"").unwrap();

        let explicit = vec![PathBuf::from("explicit.tar")];
        let resolved = resolve_partitions(explicit, Some(temp.path().to_path_buf()));

        let names: Vec<String> = resolved
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["explicit.tar", "a.tar", "b.tar"]);
    }

    #[test]
    fn positive_integer_parser_rejects_zero() {
        assert!(parse_positive_u64("3000").is_ok());
        assert!(parse_positive_u64("0").is_err());
        assert!(parse_positive_u64("-1").is_err());
    }
}
