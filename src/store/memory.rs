use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{body_id, Reader, Writer};
use crate::error::{Error, Result};

/// In-process record store. Reads and writes share one map, so a single
/// instance can back both sides of an operation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<i64, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a serialized record, keyed by its `wof:id`.
    pub fn insert(&self, body: impl Into<Vec<u8>>) -> Result<i64> {
        let body = body.into();
        let id = body_id(&body)?;
        self.records
            .write()
            .map_err(|_| Error::Malformed("memory store lock poisoned".to_string()))?
            .insert(id, body);
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Option<Vec<u8>> {
        self.records.read().ok()?.get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.records
            .read()
            .map(|records| records.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Reader for MemoryStore {
    fn read(&self, id: i64) -> Result<Vec<u8>> {
        self.get(id).ok_or(Error::NotFound(id))
    }
}

impl Writer for MemoryStore {
    fn write(&self, body: &[u8]) -> Result<String> {
        let id = self.insert(body.to_vec())?;
        Ok(format!("mem#{id}"))
    }
}
