//! Move a property to a new path in every iterated record that has it.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};

use exportify::config::{CorpusArgs, RewriteArgs};
use exportify::logging;

#[derive(Parser, Debug)]
#[command(name = "wof-rename-property", version, about = "Rename a property in records")]
struct Args {
    #[command(flatten)]
    corpus: CorpusArgs,

    #[command(flatten)]
    rewrite: RewriteArgs,

    #[arg(long)]
    old_path: String,

    #[arg(long)]
    new_path: String,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    if args.old_path == args.new_path {
        bail!("old and new paths are both '{}'", args.old_path);
    }

    let walker = args.corpus.walker()?;
    let writer = args.rewrite.writer()?;
    let exporter = args.rewrite.exporter()?;

    let mut renamed = 0usize;
    walker
        .walk(&args.corpus.roots, |path, mut record| {
            let Some(value) = record.delete(&args.old_path) else {
                return Ok(());
            };
            record.set(&args.new_path, value)?;
            let body = exporter.export(&record.to_bytes()?)?;
            let key = writer.write(&body)?;
            debug!(path = %path.display(), key = %key, "renamed property");
            renamed += 1;
            Ok(())
        })
        .context("failed to rename property")?;

    info!(renamed, old = %args.old_path, new = %args.new_path, "renamed property");
    Ok(())
}
