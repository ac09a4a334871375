//! Parallel dispatch of many independent queries against one tree.
use log::{debug, trace};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::VpTreeConfig;
use crate::error::{Result, VpTreeError};
use crate::metric::{Metric, Scalar};
use crate::neighbors::Neighbors;
use crate::vptree::VpTree;

/// Build the dedicated worker pool requested by `config`, if any.
pub(crate) fn worker_pool(config: &VpTreeConfig) -> Result<Option<ThreadPool>> {
    config
        .num_threads
        .map(|n| {
            ThreadPoolBuilder::new()
                .num_threads(n)
                .thread_name(|i| format!("vptree-worker-{}", i))
                .build()
                .map_err(|e| VpTreeError::WorkerPool(e.to_string()))
        })
        .transpose()
}

/// Run `op` inside `pool`, or on the global pool when there is none.
pub(crate) fn install<T, OP>(pool: Option<&ThreadPool>, op: OP) -> T
where
    T: Send,
    OP: FnOnce() -> T + Send,
{
    match pool {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

impl<F: Scalar, M: Metric<F>> VpTree<F, M> {
    /// Find the `k` nearest neighbors of every query, in parallel.
    ///
    /// `result[i]` answers `queries[i]` and equals
    /// `self.nearest_neighbors(&queries[i], k)`. Every query is validated
    /// before any search starts; the first invalid one fails the whole
    /// batch with the error a single query would have returned.
    pub fn nearest_neighbors_batch<R>(&self, queries: &[R], k: usize) -> Result<Vec<Neighbors<F>>>
    where
        R: AsRef<[F]> + Sync,
    {
        self.check_k(k)?;
        for (i, query) in queries.iter().enumerate() {
            if let Err(e) = self.check_query(query.as_ref(), k) {
                debug!(
                    "rejecting batch of {} queries: query {} is invalid: {}",
                    queries.len(),
                    i,
                    e
                );
                return Err(e);
            }
        }

        trace!(
            "dispatching {} queries (k = {}) on {} pool",
            queries.len(),
            k,
            if self.pool().is_some() { "dedicated" } else { "global" }
        );

        // Indexed collect writes each answer at its query's position.
        let results: Vec<Neighbors<F>> = install(self.pool(), || {
            queries
                .par_iter()
                .map(|query| self.search(query.as_ref(), k, true).0)
                .collect()
        });
        Ok(results)
    }
}
