//! Rayon thread pool configuration for parallel corpus scans.
//!
//! Use [WorkerPool::install] to run a scan with a fixed number of threads, or
//! rely on Rayon's default (all CPU cores).

use rayon::ThreadPoolBuilder;

use crate::error::{Error, Result};

/// Configures how many worker threads a parallel scan uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPool {
    /// Number of worker threads. If 0, use the global Rayon pool.
    pub workers: usize,
}

impl WorkerPool {
    /// Use exactly `n` worker threads.
    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Run a closure with this worker count. If [workers](WorkerPool::workers) is 0
    /// the global pool is used, otherwise a temporary pool is built.
    pub fn install<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            return Ok(f());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|err| Error::Malformed(format!("failed to build thread pool: {err}")))?;
        Ok(pool.install(f))
    }
}
