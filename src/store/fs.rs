use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{body_id, Reader, Writer};
use crate::error::{Error, Result};

/// Relative location of a record: the id's digits in groups of three, then the file.
///
/// `101736545` lives at `101/736/545/101736545.geojson`.
pub fn id_path(id: i64) -> Result<PathBuf> {
    if id < 0 {
        return Err(Error::InvalidInput(format!(
            "cannot derive a path for negative id {id}"
        )));
    }

    let digits = id.to_string();
    let mut path = PathBuf::new();
    for chunk in digits.as_bytes().chunks(3) {
        path.push(String::from_utf8_lossy(chunk).as_ref());
    }
    path.push(format!("{id}.geojson"));
    Ok(path)
}

/// A Who's On First `data` directory on local disk.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, id: i64) -> Result<PathBuf> {
        Ok(self.root.join(id_path(id)?))
    }
}

impl Reader for FsStore {
    fn read(&self, id: i64) -> Result<Vec<u8>> {
        let path = self.record_path(id)?;
        fs::read(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => Error::NotFound(id),
            _ => Error::Read { id, source },
        })
    }
}

impl Writer for FsStore {
    fn write(&self, body: &[u8]) -> Result<String> {
        let id = body_id(body)?;
        let relative = id_path(id)?;
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| Error::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, body).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;

        debug!(id, path = %path.display(), "wrote record");
        Ok(relative.to_string_lossy().into_owned())
    }
}
