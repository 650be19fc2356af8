//! Walk a corpus of record files on disk.
//!
//! Iterator URIs name the mode and optional filters:
//! `repo://`, `directory://` or `file://`, with `?include=PATH=REGEXP`
//! (repeatable) and `?include_mode=all|any`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use url::Url;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::query::{Query, QueryMode, QuerySet};
use crate::record::Record;

pub const DEFAULT_ITERATOR_URI: &str = "repo://";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterMode {
    /// Each root is a repository; records live under `<root>/data`.
    Repo,
    Directory,
    /// Each root is a single record file.
    File,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub visited: usize,
    pub skipped_alternate: usize,
    pub filtered: usize,
}

#[derive(Debug, Clone)]
pub struct Walker {
    mode: IterMode,
    filter: QuerySet,
}

impl Walker {
    pub fn new(mode: IterMode) -> Self {
        Self {
            mode,
            filter: QuerySet::default(),
        }
    }

    pub fn from_uri(uri: &str) -> Result<Self> {
        let unsupported = || Error::UnsupportedUri {
            kind: "iterator",
            uri: uri.to_string(),
        };
        let url = Url::parse(uri).map_err(|_| unsupported())?;
        let mode = match url.scheme() {
            "repo" => IterMode::Repo,
            "directory" => IterMode::Directory,
            "file" => IterMode::File,
            _ => return Err(unsupported()),
        };

        let mut queries = Vec::new();
        let mut query_mode = QueryMode::All;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "include" => queries.push(Query::parse(&value)?),
                "include_mode" => query_mode = QueryMode::parse(&value)?,
                _ => {}
            }
        }

        Ok(Self {
            mode,
            filter: QuerySet::new(queries, query_mode),
        })
    }

    pub fn mode(&self) -> IterMode {
        self.mode
    }

    /// Add filters on top of those named in the URI. `mode` replaces the URI's mode.
    pub fn with_queries(mut self, queries: Vec<Query>, mode: Option<QueryMode>) -> Self {
        self.filter.queries.extend(queries);
        if let Some(mode) = mode {
            self.filter.mode = mode;
        }
        self
    }

    /// Every record file under `roots` in file-name order, alternates included.
    pub fn files(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for root in roots {
            let start = match self.mode {
                IterMode::File => {
                    files.push(root.clone());
                    continue;
                }
                IterMode::Repo => root.join("data"),
                IterMode::Directory => root.clone(),
            };
            for entry in WalkDir::new(&start).sort_by_file_name() {
                let entry = entry.map_err(io::Error::from)?;
                if entry.file_type().is_file() && is_record_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        }
        Ok(files)
    }

    /// True when `record` passes the walker's filters.
    pub fn accepts(&self, record: &Record) -> bool {
        self.filter.matches(record.as_value())
    }

    /// Visit every record under `roots` in file-name order.
    pub fn walk<F>(&self, roots: &[PathBuf], mut visit: F) -> Result<WalkStats>
    where
        F: FnMut(&Path, Record) -> Result<()>,
    {
        let mut stats = WalkStats::default();

        for path in self.files(roots)? {
            if is_alternate(&path) {
                debug!(path = %path.display(), "skipping alternate geometry");
                stats.skipped_alternate += 1;
                continue;
            }

            let record = read_record(&path)?;
            if !self.accepts(&record) {
                stats.filtered += 1;
                continue;
            }

            stats.visited += 1;
            visit(&path, record)?;
        }

        info!(
            visited = stats.visited,
            skipped_alternate = stats.skipped_alternate,
            filtered = stats.filtered,
            "finished iterating"
        );
        Ok(stats)
    }
}

pub fn read_record(path: &Path) -> Result<Record> {
    let body = fs::read(path)?;
    Record::from_bytes(&body)
        .map_err(|err| Error::Malformed(format!("{}: {err}", path.display())))
}

fn is_record_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "geojson")
}

/// Alternate geometry files are named `<id>-alt-<label>.geojson`.
pub fn is_alternate(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().contains("-alt-"))
        .unwrap_or(false)
}
