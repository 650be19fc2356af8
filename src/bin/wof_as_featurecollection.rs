//! Print every iterated record as a single GeoJSON FeatureCollection.

use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use clap::Parser;

use exportify::config::CorpusArgs;
use exportify::logging;
use exportify::output::write_feature_collection;

#[derive(Parser, Debug)]
#[command(name = "wof-as-featurecollection", version, about = "Print records as a FeatureCollection")]
struct Args {
    #[command(flatten)]
    corpus: CorpusArgs,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let walker = args.corpus.walker()?;
    let mut out = BufWriter::new(io::stdout().lock());
    write_feature_collection(&walker, &args.corpus.roots, &mut out)
        .context("failed to write feature collection")?;
    Ok(())
}
