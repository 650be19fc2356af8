//! Ensure every iterated record carries the given property values.
//!
//! wof-ensure-properties --string-property properties.src:geom=quattroshapes \
//!     --writer-uri repo:///usr/local/data/whosonfirst-data-admin-us /usr/local/data/whosonfirst-data-admin-us

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};

use exportify::config::{CorpusArgs, PropertyArgs, RewriteArgs};
use exportify::logging;
use exportify::query::{Query, QueryMode};

#[derive(Parser, Debug)]
#[command(name = "wof-ensure-properties", version, about = "Ensure records carry the given property values")]
struct Args {
    #[command(flatten)]
    corpus: CorpusArgs,

    #[command(flatten)]
    rewrite: RewriteArgs,

    #[command(flatten)]
    properties: PropertyArgs,

    /// {PATH}={REGEXP} a record must match to be updated
    #[arg(long = "query", value_parser = Query::parse)]
    queries: Vec<Query>,

    #[arg(long, value_enum)]
    query_mode: Option<QueryMode>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let updates = args.properties.updates();
    if updates.is_empty() {
        bail!("nothing to ensure; pass --string-property, --int-property or --float-property");
    }

    let walker = args
        .corpus
        .walker()?
        .with_queries(args.queries.clone(), args.query_mode);
    let writer = args.rewrite.writer()?;
    let exporter = args.rewrite.exporter()?;

    let mut updated = 0usize;
    walker
        .walk(&args.corpus.roots, |path, mut record| {
            if !updates.apply(&mut record)? {
                return Ok(());
            }
            let body = exporter.export(&record.to_bytes()?)?;
            let key = writer.write(&body)?;
            debug!(path = %path.display(), key = %key, "updated record");
            updated += 1;
            Ok(())
        })
        .context("failed to ensure properties")?;

    info!(updated, "ensured properties");
    Ok(())
}
