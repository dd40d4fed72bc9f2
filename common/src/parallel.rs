//! Bounded worker pool for independent CPU-bound tasks.
//!
//! Wraps a dedicated rayon pool so callers can cap the number of tasks in
//! flight without touching the global pool. Results always come back in input
//! order, whatever order the tasks finish in.

use std::num::NonZeroUsize;

use rayon::prelude::*;

/// Number of workers the host can run in parallel, at least 1.
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Builds a pool with `max_workers` threads, or one per available core when
    /// `None`. A cap of 0 is treated as 1.
    pub fn new(max_workers: Option<usize>) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = max_workers.unwrap_or_else(available_workers).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("worker-{i}"))
            .build()?;

        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Maps `f` over `items` on the pool and blocks until every task is done.
    /// Results keep the order of `items`.
    ///
    /// Returns one of the errors if any task fails. Tasks already running when
    /// the error is observed are allowed to finish; their results are discarded.
    pub fn try_map<T, R, E, F>(&self, items: &[T], f: F) -> Result<Vec<R>, E>
    where
        T: Sync,
        R: Send,
        E: Send,
        F: Fn(&T) -> Result<R, E> + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(&f).collect())
    }
}
