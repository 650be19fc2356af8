//! Print selected properties of every iterated record as CSV.

use std::io;

use anyhow::{Context, Result};
use clap::Parser;

use exportify::config::CorpusArgs;
use exportify::logging;
use exportify::output::write_csv;

#[derive(Parser, Debug)]
#[command(name = "wof-as-csv", version, about = "Print record properties as CSV")]
struct Args {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Property to include, without the properties. prefix; `path` is the record's file
    #[arg(long = "field", required = true)]
    fields: Vec<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let walker = args.corpus.walker()?;
    write_csv(&walker, &args.corpus.roots, &args.fields, io::stdout().lock())
        .context("failed to write csv")?;
    Ok(())
}
