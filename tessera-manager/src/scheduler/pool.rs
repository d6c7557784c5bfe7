//! Worker pool
//!
//! Runs a list of independent tasks with bounded concurrency and waits for
//! all of them. A permit is taken before each task is spawned, so tasks start
//! in list order and a single-worker pool runs them strictly one after the
//! other.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ManagerError, Result};

/// Bounded fan-out/fan-in over tokio tasks
#[derive(Debug, Clone)]
pub struct WorkerPool {
    max_workers: usize,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Creates a pool running at most `max_workers` tasks at once
    ///
    /// Tasks not yet started when `cancel` fires are skipped.
    pub fn new(max_workers: usize, cancel: CancellationToken) -> Self {
        Self {
            max_workers: max_workers.max(1),
            cancel,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Runs every task and returns one outcome per task, in task order
    ///
    /// A failing task does not stop the others: every spawned task is joined
    /// before this returns. Skipped tasks report [`ManagerError::Cancelled`]
    /// and panicked tasks [`ManagerError::WorkerPanicked`].
    pub async fn run_all<T, F, Fut>(&self, tasks: Vec<F>) -> Vec<Result<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut handles = Vec::with_capacity(tasks.len());

        debug!(
            "Dispatching {} task(s) over {} worker(s)",
            tasks.len(),
            self.max_workers
        );

        for task in tasks {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                handles.push(None);
                continue;
            };

            let future = task();
            handles.push(Some(tokio::spawn(async move {
                let _permit = permit;
                future.await
            })));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = match handle {
                None => Err(ManagerError::Cancelled),
                Some(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Worker task panicked: {}", e);
                        Err(ManagerError::WorkerPanicked(e.to_string()))
                    }
                },
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
