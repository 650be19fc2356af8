use std::io::{self, BufRead, Read};

use clap::{Parser, Subcommand};
use tracing::error;

use crate::config::{PropertyArgs, StoreArgs};
use crate::error::{Error, Result};
use crate::ops::parse_geometry;
use crate::supersede::{clone_relation, Outcome};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "wof-exportify", version, about = "Deprecate, supersede, clone and export Who's On First records")]
pub struct Cli {
    #[command(flatten)]
    pub stores: StoreArgs,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mark records deprecated, optionally naming their replacements
    Deprecate {
        #[arg(short = 'i', long = "id", required = true)]
        ids: Vec<i64>,
        /// Id of a record that supersedes these records
        #[arg(long = "superseded-by")]
        superseded_by: Vec<i64>,
        /// EDTF date [default: today]
        #[arg(long)]
        date: Option<String>,
    },
    /// Mark records as having ceased to exist
    Cessate {
        #[arg(short = 'i', long = "id", required = true)]
        ids: Vec<i64>,
        /// EDTF date [default: today]
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "superseded-by")]
        superseded_by: Vec<i64>,
        /// Supersede each record with a copy that starts on the cessation date
        #[arg(long)]
        supersede_with_copy: bool,
    },
    /// Record that records are superseded by others, without deprecating them
    SupersededBy {
        #[arg(short = 'i', long = "id", required = true)]
        ids: Vec<i64>,
        #[arg(long = "superseded-by", required = true)]
        by: Vec<i64>,
    },
    /// Replace records with copies parented by a new record
    SupersedeWithParent {
        #[arg(short = 'i', long = "id", required = true)]
        ids: Vec<i64>,
        #[arg(long)]
        parent_id: i64,
    },
    /// Create a new record from a copy of an existing one
    Clone {
        #[arg(short = 'i', long = "id")]
        id: i64,
        /// The clone supersedes the source
        #[arg(long)]
        supersedes: bool,
        /// The clone is superseded by the source
        #[arg(long)]
        superseded: bool,
        #[command(flatten)]
        properties: PropertyArgs,
    },
    /// Deprecate records and replace each with a new copy
    DeprecateAndSupersede {
        #[arg(short = 'i', long = "id", required = true)]
        ids: Vec<i64>,
        #[command(flatten)]
        properties: PropertyArgs,
    },
    /// Normalize and rewrite records
    Export {
        #[arg(short = 'i', long = "id", required_unless_present = "stdin")]
        ids: Vec<i64>,
        /// Read a single record from stdin
        #[arg(long, conflicts_with = "ids")]
        stdin: bool,
    },
    /// Assign a parent id and hierarchy to records
    AssignParent {
        #[arg(short = 'i', long = "id", required = true)]
        ids: Vec<i64>,
        #[arg(long)]
        parent_id: i64,
    },
    /// Copy the geometry of one record to others
    AssignGeometry {
        #[arg(long)]
        source_id: i64,
        /// Target ids
        targets: Vec<i64>,
        /// Also read target ids from stdin, one per line
        #[arg(long)]
        stdin: bool,
    },
    /// Create a new record
    Create {
        /// GeoJSON geometry
        #[arg(long)]
        geometry: String,
        #[command(flatten)]
        properties: PropertyArgs,
    },
}

pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = err.print();
            return code;
        }
    };

    crate::logging::init(cli.verbose);

    match run(&cli) {
        Ok(outcome) => {
            for id in &outcome.created {
                println!("{id}");
            }
            EXIT_SUCCESS
        }
        Err(err) => {
            error!("{err}");
            exit_code(&err)
        }
    }
}

pub fn exit_code(err: &Error) -> i32 {
    if err.is_usage() {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run(cli: &Cli) -> Result<Outcome> {
    // Flag validation that does not need a store happens before any store is opened.
    if let Command::Clone {
        supersedes,
        superseded,
        ..
    } = &cli.command
    {
        clone_relation(*supersedes, *superseded)?;
    }
    if let Command::Create { geometry, .. } = &cli.command {
        parse_geometry(geometry)?;
    }

    let coordinator = cli.stores.coordinator()?;

    match &cli.command {
        Command::Deprecate {
            ids,
            superseded_by,
            date,
        } => coordinator.deprecate(ids, superseded_by, date.as_deref()),
        Command::Cessate {
            ids,
            date,
            superseded_by,
            supersede_with_copy,
        } => coordinator.cessate(ids, date.as_deref(), superseded_by, *supersede_with_copy),
        Command::SupersededBy { ids, by } => coordinator.superseded_by(ids, by),
        Command::SupersedeWithParent { ids, parent_id } => {
            coordinator.supersede_with_parent(ids, *parent_id)
        }
        Command::Clone {
            id,
            supersedes,
            superseded,
            properties,
        } => {
            let relation = clone_relation(*supersedes, *superseded)?;
            coordinator.clone_feature(*id, relation, &properties.updates())
        }
        Command::DeprecateAndSupersede { ids, properties } => {
            coordinator.deprecate_and_supersede(ids, &properties.updates())
        }
        Command::Export { ids, stdin } => {
            if *stdin {
                let mut body = Vec::new();
                io::stdin().read_to_end(&mut body)?;
                coordinator.export_bytes(&body)
            } else {
                coordinator.export_ids(ids)
            }
        }
        Command::AssignParent { ids, parent_id } => coordinator.assign_parent(ids, *parent_id),
        Command::AssignGeometry {
            source_id,
            targets,
            stdin,
        } => {
            let mut targets = targets.clone();
            if *stdin {
                targets.extend(read_ids(io::stdin().lock())?);
            }
            coordinator.assign_geometry(*source_id, &targets)
        }
        Command::Create {
            geometry,
            properties,
        } => coordinator.create(parse_geometry(geometry)?, &properties.updates()),
    }
}

/// Parse one id per line, ignoring blank lines.
pub fn read_ids<R: BufRead>(input: R) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let id = line
            .parse::<i64>()
            .map_err(|_| Error::InvalidInput(format!("invalid id '{line}'")))?;
        ids.push(id);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_repeated_ids_and_global_store_flags() {
        let cli = Cli::try_parse_from(args(&[
            "wof-exportify",
            "deprecate",
            "-i",
            "101",
            "--id",
            "102",
            "--superseded-by",
            "200",
            "--writer-uri",
            "null://",
        ]))
        .unwrap();

        assert_eq!(cli.stores.writer_uri.as_deref(), Some("null://"));
        match cli.command {
            Command::Deprecate {
                ids, superseded_by, ..
            } => {
                assert_eq!(ids, vec![101, 102]);
                assert_eq!(superseded_by, vec![200]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn property_flags_parse_into_updates() {
        let cli = Cli::try_parse_from(args(&[
            "wof-exportify",
            "clone",
            "--id",
            "5",
            "--superseded",
            "--string-property",
            "properties.wof:name=Copy",
            "--int-property",
            "properties.sfo:level=2",
        ]))
        .unwrap();

        let Command::Clone { properties, .. } = cli.command else {
            panic!("expected clone");
        };
        let updates = properties.updates();
        assert_eq!(updates.strings[0].value, "Copy");
        assert_eq!(updates.ints[0].value, 2);
    }

    #[test]
    fn missing_ids_are_usage_errors() {
        assert_eq!(run_with_args(&args(&["wof-exportify", "deprecate"])), EXIT_USAGE);
        assert_eq!(run_with_args(&args(&["wof-exportify"])), EXIT_USAGE);
    }

    #[test]
    fn read_ids_skips_blank_lines() {
        let ids = read_ids("101\n\n 202 \n".as_bytes()).unwrap();
        assert_eq!(ids, vec![101, 202]);
        assert!(read_ids("abc\n".as_bytes()).unwrap_err().is_usage());
    }
}
