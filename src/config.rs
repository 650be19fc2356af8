//! Store and exporter selection shared by the command-line tools.
//!
//! Unset reader and writer URIs fall back to `fs://<source>/data`, where
//! `<source>` is `-s` made absolute, or the current directory.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;

use crate::error::{Error, Result};
use crate::export::{new_exporter, Exporter, DEFAULT_EXPORTER_URI};
use crate::iterate::{Walker, DEFAULT_ITERATOR_URI};
use crate::merge::MergeTarget;
use crate::store::{new_reader, new_writer, Writer};
use crate::supersede::Coordinator;
use crate::update::{parse_key_value, KeyValue, PropertyUpdates};

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Root directory of a Who's On First repository [default: current directory]
    #[arg(short = 's', long = "source", global = true)]
    pub source: Option<PathBuf>,

    /// Store to read records from [default: fs://<source>/data]
    #[arg(long, env = "WOF_READER_URI", global = true)]
    pub reader_uri: Option<String>,

    /// Store to read parent records from [default: the reader URI]
    #[arg(long, global = true)]
    pub parent_reader_uri: Option<String>,

    /// Store to write records to [default: fs://<source>/data]
    #[arg(long, env = "WOF_WRITER_URI", global = true)]
    pub writer_uri: Option<String>,

    #[arg(long, env = "WOF_EXPORTER_URI", global = true, default_value = DEFAULT_EXPORTER_URI)]
    pub exporter_uri: String,
}

impl Default for StoreArgs {
    fn default() -> Self {
        Self {
            source: None,
            reader_uri: None,
            parent_reader_uri: None,
            writer_uri: None,
            exporter_uri: DEFAULT_EXPORTER_URI.to_string(),
        }
    }
}

/// Fully resolved URIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUris {
    pub reader: String,
    pub parent_reader: String,
    pub writer: String,
    pub exporter: String,
}

impl StoreArgs {
    pub fn resolve(&self) -> Result<StoreUris> {
        let fallback = || data_uri(self.source.as_deref());

        let reader = match &self.reader_uri {
            Some(uri) => uri.clone(),
            None => fallback()?,
        };
        let writer = match &self.writer_uri {
            Some(uri) => uri.clone(),
            None => fallback()?,
        };
        let parent_reader = self
            .parent_reader_uri
            .clone()
            .unwrap_or_else(|| reader.clone());

        Ok(StoreUris {
            reader,
            parent_reader,
            writer,
            exporter: self.exporter_uri.clone(),
        })
    }

    pub fn coordinator(&self) -> Result<Coordinator> {
        let uris = self.resolve()?;
        let reader = new_reader(&uris.reader)?;
        let parent_reader = if uris.parent_reader == uris.reader {
            Arc::clone(&reader)
        } else {
            new_reader(&uris.parent_reader)?
        };
        Ok(Coordinator::new(reader, new_writer(&uris.writer)?, new_exporter(&uris.exporter)?)
            .with_parent_reader(parent_reader))
    }

    pub fn merge_target(&self) -> Result<MergeTarget> {
        let uris = self.resolve()?;
        Ok(MergeTarget::new(
            new_reader(&uris.reader)?,
            new_writer(&uris.writer)?,
            new_exporter(&uris.exporter)?,
        ))
    }
}

/// `--string-property`, `--int-property` and `--float-property` assignments.
#[derive(Args, Debug, Clone, Default)]
pub struct PropertyArgs {
    /// {PATH}={VALUE} assigning a string
    #[arg(long = "string-property", value_name = "PATH=VALUE", value_parser = parse_key_value::<String>)]
    pub strings: Vec<KeyValue<String>>,

    /// {PATH}={VALUE} assigning an integer
    #[arg(long = "int-property", value_name = "PATH=VALUE", value_parser = parse_key_value::<i64>)]
    pub ints: Vec<KeyValue<i64>>,

    /// {PATH}={VALUE} assigning a float
    #[arg(long = "float-property", value_name = "PATH=VALUE", value_parser = parse_key_value::<f64>)]
    pub floats: Vec<KeyValue<f64>>,
}

impl PropertyArgs {
    pub fn updates(&self) -> PropertyUpdates {
        PropertyUpdates {
            strings: self.strings.clone(),
            ints: self.ints.clone(),
            floats: self.floats.clone(),
        }
    }
}

/// Which records a corpus tool iterates.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// repo://, directory:// or file://, with optional ?include=PATH=REGEXP filters
    #[arg(long, default_value = DEFAULT_ITERATOR_URI)]
    pub iterator_uri: String,

    /// Repositories, directories or files to iterate
    #[arg(required = true)]
    pub roots: Vec<PathBuf>,
}

impl CorpusArgs {
    pub fn walker(&self) -> Result<Walker> {
        Walker::from_uri(&self.iterator_uri)
    }
}

/// Where a corpus tool sends the records it changes.
#[derive(Args, Debug, Clone)]
pub struct RewriteArgs {
    #[arg(long, env = "WOF_WRITER_URI", default_value = "null://")]
    pub writer_uri: String,

    #[arg(long, env = "WOF_EXPORTER_URI", default_value = DEFAULT_EXPORTER_URI)]
    pub exporter_uri: String,
}

impl RewriteArgs {
    pub fn writer(&self) -> Result<Arc<dyn Writer>> {
        new_writer(&self.writer_uri)
    }

    pub fn exporter(&self) -> Result<Arc<dyn Exporter>> {
        new_exporter(&self.exporter_uri)
    }
}

/// `fs://<abs source>/data`.
pub fn data_uri(source: Option<&Path>) -> Result<String> {
    let cwd = env::current_dir()
        .map_err(|err| Error::InvalidInput(format!("cannot determine current directory: {err}")))?;
    let root = match source {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd,
    };
    Ok(format!("fs://{}", root.join("data").display()))
}
