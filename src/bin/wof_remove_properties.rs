//! Remove one or more properties from every iterated record.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use exportify::config::{CorpusArgs, RewriteArgs};
use exportify::error::Error;
use exportify::logging;

#[derive(Parser, Debug)]
#[command(name = "wof-remove-properties", version, about = "Remove properties from records")]
struct Args {
    #[command(flatten)]
    corpus: CorpusArgs,

    #[command(flatten)]
    rewrite: RewriteArgs,

    /// Path to remove, e.g. properties.wof:geom_alt
    #[arg(long = "path", required = true)]
    paths: Vec<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let walker = args.corpus.walker()?;
    let writer = args.rewrite.writer()?;

    let mut updated = 0usize;
    walker
        .walk(&args.corpus.roots, |path, mut record| {
            let removed = args
                .paths
                .iter()
                .filter(|target| record.delete(target).is_some())
                .count();
            if removed == 0 {
                return Ok(());
            }
            // Written as-is; the exporter is not involved.
            let body = serde_json::to_vec_pretty(record.as_value())
                .map_err(|err| Error::json("record", err))?;
            let key = writer.write(&body)?;
            debug!(path = %path.display(), key = %key, removed, "removed properties");
            updated += 1;
            Ok(())
        })
        .context("failed to remove properties")?;

    info!(updated, "removed properties");
    Ok(())
}
