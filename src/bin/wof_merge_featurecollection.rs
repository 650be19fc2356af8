//! Copy paths from the features of GeoJSON FeatureCollections onto their records.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::info;

use exportify::config::StoreArgs;
use exportify::iterate::{Walker, DEFAULT_ITERATOR_URI};
use exportify::logging;
use exportify::merge::{build_lookup, merge_feature_collection, FeatureMerge};
use exportify::pool::WorkerPool;

#[derive(Parser, Debug)]
#[command(name = "wof-merge-featurecollection", version, about = "Merge FeatureCollection features into records")]
struct Args {
    #[command(flatten)]
    stores: StoreArgs,

    /// Path to copy from each feature, e.g. geometry or properties.src:geom
    #[arg(long = "path", required = true)]
    paths: Vec<String>,

    /// Resolve features through this path instead of properties.wof:id
    #[arg(long)]
    lookup_key: Option<String>,

    /// Repository, directory or file scanned to build the lookup map
    #[arg(long = "lookup-source")]
    lookup_sources: Vec<PathBuf>,

    #[arg(long, default_value = DEFAULT_ITERATOR_URI)]
    lookup_iterator_uri: String,

    /// Threads used to build the lookup map [default: all cores]
    #[arg(long, default_value_t = 0)]
    workers: usize,

    #[arg(short, long)]
    verbose: bool,

    /// FeatureCollection files to merge
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let lookup = match &args.lookup_key {
        Some(key) => {
            if args.lookup_sources.is_empty() {
                bail!("--lookup-key needs at least one --lookup-source");
            }
            let walker = Walker::from_uri(&args.lookup_iterator_uri)?;
            let pool = WorkerPool::with_workers(args.workers);
            Some(
                build_lookup(&walker, &args.lookup_sources, key, pool)
                    .context("failed to build lookup map")?,
            )
        }
        None => None,
    };

    let merge = FeatureMerge {
        paths: args.paths.clone(),
        lookup,
    };
    let target = args.stores.merge_target()?;

    for file in &args.files {
        let body = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
        let collection: Value = serde_json::from_slice(&body)
            .with_context(|| format!("failed to parse {}", file.display()))?;
        let stats = merge_feature_collection(&target, &collection, &merge)
            .with_context(|| format!("failed to merge {}", file.display()))?;
        info!(
            file = %file.display(),
            updated = stats.updated.len(),
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            "merged feature collection"
        );
    }
    Ok(())
}
