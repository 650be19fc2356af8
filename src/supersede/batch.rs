//! Staged writes for multi-record operations.
//!
//! Every record an operation touches is exported and staged before anything is
//! written. [`Batch::commit`] then writes in staging order. A failure on the
//! first write aborts cleanly; a failure after that is logged, the remaining
//! writes still run, and the result is [`Error::PartialCommit`].

use tracing::{error, info};

use crate::error::{Error, Result};
use crate::store::Writer;

#[derive(Debug, Clone)]
struct Staged {
    id: i64,
    body: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Batch {
    staged: Vec<Staged>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an exported record body. A later entry for the same id replaces the earlier one.
    pub fn stage(&mut self, id: i64, body: Vec<u8>) {
        match self.staged.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => entry.body = body,
            None => self.staged.push(Staged { id, body }),
        }
    }

    pub fn ids(&self) -> Vec<i64> {
        self.staged.iter().map(|entry| entry.id).collect()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Write every staged record. Returns the ids written, in order.
    pub fn commit(self, writer: &dyn Writer) -> Result<Vec<i64>> {
        let mut written = Vec::with_capacity(self.staged.len());
        let mut failed = Vec::new();

        for (index, entry) in self.staged.into_iter().enumerate() {
            match writer.write(&entry.body) {
                Ok(key) => {
                    info!(id = entry.id, key = %key, "wrote record");
                    written.push(entry.id);
                }
                Err(err) if index == 0 => return Err(err),
                Err(err) => {
                    error!(id = entry.id, error = %err, "failed to write record");
                    failed.push((entry.id, err.to_string()));
                }
            }
        }

        if failed.is_empty() {
            Ok(written)
        } else {
            Err(Error::PartialCommit { written, failed })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::store::{body_id, MemoryStore};

    fn body(id: i64) -> Vec<u8> {
        format!(r#"{{"properties":{{"wof:id":{id}}}}}"#).into_bytes()
    }

    /// Fails the write at position `fail_at`.
    struct FailingWriter {
        inner: MemoryStore,
        calls: AtomicUsize,
        fail_at: usize,
    }

    impl Writer for FailingWriter {
        fn write(&self, body: &[u8]) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_at {
                return Err(Error::Malformed(format!("refusing {}", body_id(body)?)));
            }
            self.inner.write(body)
        }
    }

    fn failing_at(fail_at: usize) -> FailingWriter {
        FailingWriter {
            inner: MemoryStore::new(),
            calls: AtomicUsize::new(0),
            fail_at,
        }
    }

    #[test]
    fn restaging_an_id_replaces_its_body() {
        let mut batch = Batch::new();
        batch.stage(1, body(1));
        batch.stage(2, body(2));
        batch.stage(1, b"{}".to_vec());
        assert_eq!(batch.ids(), vec![1, 2]);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn commits_in_staging_order() {
        let store = MemoryStore::new();
        let mut batch = Batch::new();
        batch.stage(3, body(3));
        batch.stage(1, body(1));
        assert_eq!(batch.commit(&store).unwrap(), vec![3, 1]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn first_write_failure_aborts() {
        let writer = failing_at(0);
        let mut batch = Batch::new();
        batch.stage(1, body(1));
        batch.stage(2, body(2));
        let err = batch.commit(&writer).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        assert!(writer.inner.is_empty());
    }

    #[test]
    fn later_failures_are_partial() {
        let writer = failing_at(1);
        let mut batch = Batch::new();
        batch.stage(1, body(1));
        batch.stage(2, body(2));
        batch.stage(3, body(3));
        match batch.commit(&writer).unwrap_err() {
            Error::PartialCommit { written, failed } => {
                assert_eq!(written, vec![1, 3]);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].0, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
