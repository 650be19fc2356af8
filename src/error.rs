//! Error type shared by every record operation.

use std::io;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad flags or arguments, detected before any record is read.
    #[error("{0}")]
    InvalidInput(String),

    #[error("record {0} not found")]
    NotFound(i64),

    #[error("failed to read record {id}: {source}")]
    Read {
        id: i64,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid path '{path}': {reason}")]
    Path { path: String, reason: String },

    #[error("record {id} is missing {property}")]
    MissingProperty { id: i64, property: &'static str },

    #[error("{0}")]
    Malformed(String),

    #[error("unsupported {kind} URI '{uri}'")]
    UnsupportedUri { kind: &'static str, uri: String },

    #[error("invalid EDTF date '{0}'")]
    InvalidDate(String),

    #[error("export failed: {0}")]
    Export(String),

    /// Some, but not all, records of a multi-record operation were written.
    #[error("partial write: wrote {written:?}, failed {}", format_failures(failed))]
    PartialCommit {
        written: Vec<i64>,
        failed: Vec<(i64, String)>,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    pub fn path(path: &str, reason: impl Into<String>) -> Self {
        Self::Path {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors raised before any I/O took place.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::InvalidDate(_))
    }
}

fn format_failures(failed: &[(i64, String)]) -> String {
    failed
        .iter()
        .map(|(id, reason)| format!("{id} ({reason})"))
        .collect::<Vec<_>>()
        .join(", ")
}
