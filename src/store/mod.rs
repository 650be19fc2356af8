//! Record stores: read a record by id, write a record keyed by the id in its body.
//!
//! Stores are selected by URI:
//!
//! - `fs:///path/to/data` records laid out as `101/736/545/101736545.geojson`
//! - `repo:///path/to/repo` the same, rooted at `<repo>/data`
//! - `mem://` an in-process map
//! - `stdout://` and `null://` writers only

mod fs;
mod memory;

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use url::Url;

pub use fs::{id_path, FsStore};
pub use memory::MemoryStore;

use crate::error::{Error, Result};
use crate::record;

pub trait Reader: Send + Sync {
    fn read(&self, id: i64) -> Result<Vec<u8>>;
}

pub trait Writer: Send + Sync {
    /// Persist `body` and return the key it was stored under.
    fn write(&self, body: &[u8]) -> Result<String>;
}

/// Extract `properties.wof:id` from a serialized record.
pub fn body_id(body: &[u8]) -> Result<i64> {
    let doc: Value = serde_json::from_slice(body).map_err(|err| Error::json("record body", err))?;
    crate::path::get(&doc, record::ID)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Malformed("record body has no properties.wof:id".to_string()))
}

/// Writes records to standard output, one document per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutWriter;

impl Writer for StdoutWriter {
    fn write(&self, body: &[u8]) -> Result<String> {
        let id = body_id(body)?;
        let mut out = io::stdout().lock();
        out.write_all(body)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(format!("stdout#{id}"))
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWriter;

impl Writer for NullWriter {
    fn write(&self, body: &[u8]) -> Result<String> {
        let id = body_id(body)?;
        Ok(format!("null#{id}"))
    }
}

fn parse_uri(kind: &'static str, uri: &str) -> Result<Url> {
    Url::parse(uri).map_err(|_| Error::UnsupportedUri {
        kind,
        uri: uri.to_string(),
    })
}

/// Filesystem root named by a `fs://` or `repo://` URI.
fn uri_root(url: &Url) -> PathBuf {
    let path = url.path();
    match url.host_str().filter(|host| !host.is_empty()) {
        Some(host) => PathBuf::from(format!("{host}{path}")),
        None => PathBuf::from(path),
    }
}

pub fn new_reader(uri: &str) -> Result<Arc<dyn Reader>> {
    let url = parse_uri("reader", uri)?;
    match url.scheme() {
        "fs" => Ok(Arc::new(FsStore::new(uri_root(&url)))),
        "repo" => Ok(Arc::new(FsStore::new(uri_root(&url).join("data")))),
        "mem" => Ok(Arc::new(MemoryStore::new())),
        _ => Err(Error::UnsupportedUri {
            kind: "reader",
            uri: uri.to_string(),
        }),
    }
}

pub fn new_writer(uri: &str) -> Result<Arc<dyn Writer>> {
    let url = parse_uri("writer", uri)?;
    match url.scheme() {
        "fs" => Ok(Arc::new(FsStore::new(uri_root(&url)))),
        "repo" => Ok(Arc::new(FsStore::new(uri_root(&url).join("data")))),
        "mem" => Ok(Arc::new(MemoryStore::new())),
        "stdout" => Ok(Arc::new(StdoutWriter)),
        "null" => Ok(Arc::new(NullWriter)),
        _ => Err(Error::UnsupportedUri {
            kind: "writer",
            uri: uri.to_string(),
        }),
    }
}
