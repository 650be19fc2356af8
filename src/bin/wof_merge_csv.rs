//! Merge CSV columns into the properties of the records each row names.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use exportify::config::StoreArgs;
use exportify::logging;
use exportify::merge::csv::DEFAULT_LOOKUP_KEY;
use exportify::merge::{merge_csv, CsvFields};

#[derive(Parser, Debug)]
#[command(name = "wof-merge-csv", version, about = "Merge CSV columns into records")]
struct Args {
    #[command(flatten)]
    stores: StoreArgs,

    /// Column holding the id of the record to update
    #[arg(long, default_value = DEFAULT_LOOKUP_KEY)]
    lookup_key: String,

    /// Column to assign as a string
    #[arg(long = "string-field")]
    strings: Vec<String>,

    /// Column to assign as an integer
    #[arg(long = "int-field")]
    ints: Vec<String>,

    /// Column to assign as a 64-bit integer
    #[arg(long = "int64-field")]
    int64s: Vec<String>,

    #[arg(short, long)]
    verbose: bool,

    /// CSV files to merge
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let target = args.stores.merge_target()?;
    let fields = CsvFields {
        lookup_key: args.lookup_key.clone(),
        strings: args.strings.clone(),
        ints: args.ints.iter().chain(&args.int64s).cloned().collect(),
    };

    for file in &args.files {
        let input = File::open(file).with_context(|| format!("failed to open {}", file.display()))?;
        let stats = merge_csv(&target, input, &fields)
            .with_context(|| format!("failed to merge {}", file.display()))?;
        info!(
            file = %file.display(),
            updated = stats.updated.len(),
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            "merged csv"
        );
    }
    Ok(())
}
