//! Bounded fan-out for per-case mutations
//!
//! Runs one future per case with at most `max_concurrency` in flight and
//! hands results back in input order, so per-case error attribution and
//! candidate ordering survive parallel execution.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Pool statistics for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Jobs run
    pub total: usize,
    /// Jobs that returned `Ok`
    pub succeeded: usize,
    /// Jobs that returned `Err`
    pub failed: usize,
}

/// Bounded worker pool
#[derive(Debug, Clone, Copy)]
pub struct MutationPool {
    max_concurrency: usize,
}

impl MutationPool {
    /// Create new pool; a limit of zero is treated as one
    #[inline]
    #[must_use]
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Concurrency limit
    #[inline]
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run `job` over every item; results come back in input order
    pub async fn run<T, O, E, F, Fut>(&self, items: Vec<T>, job: F) -> (Vec<Result<O, E>>, PoolStats)
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<O, E>>,
    {
        let total = items.len();

        let mut indexed: Vec<(usize, Result<O, E>)> = if self.max_concurrency == 1 {
            let mut out = Vec::with_capacity(total);
            for (i, item) in items.into_iter().enumerate() {
                out.push((i, job(item).await));
            }
            out
        } else {
            stream::iter(items.into_iter().enumerate())
                .map(|(i, item)| {
                    let fut = job(item);
                    async move { (i, fut.await) }
                })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await
        };

        indexed.sort_by_key(|(i, _)| *i);

        let succeeded = indexed.iter().filter(|(_, r)| r.is_ok()).count();
        let stats = PoolStats {
            total,
            succeeded,
            failed: total - succeeded,
        };

        (indexed.into_iter().map(|(_, r)| r).collect(), stats)
    }
}

impl Default for MutationPool {
    fn default() -> Self {
        Self::new(1)
    }
}
