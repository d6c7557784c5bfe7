//! Lifecycle manager
//!
//! Drives a fixed set of runnables, all bound to one project, through
//! submission, polling and result retrieval exactly once:
//!
//! ```text
//! INITIALIZED --submit()--> SUBMITTED --update_state() (all terminal)--> COMPLETED
//! ```
//!
//! Pooled workers never touch the runnable list. Each task owns a copy of
//! the inputs it needs and returns its output; the manager writes outputs
//! back into the slice the task was built from, so writes can never overlap.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tessera_core::domain::result::ResultBundle;
use tessera_core::domain::runnable::Runnable;
use tessera_core::domain::state::StateSummary;
use tessera_core::domain::status::StatusSnapshot;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{ManagerConfig, PartialSubmissionPolicy};
use crate::error::{ManagerError, Result};
use crate::repository::RemoteJobStore;
use crate::scheduler::pool::WorkerPool;
use crate::service::{StatusCache, StatusReader};

/// Manager-level lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Initialized,
    Submitted,
    Completed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Initialized => write!(f, "INITIALIZED"),
            LifecycleState::Submitted => write!(f, "SUBMITTED"),
            LifecycleState::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Drives a batch of runnables against a job store
pub struct LifecycleManager {
    store: Arc<dyn RemoteJobStore>,
    runnables: Vec<Runnable>,
    project_id: String,
    config: ManagerConfig,
    state: LifecycleState,
    status: StatusCache,
    cancel: CancellationToken,
}

impl LifecycleManager {
    /// Creates a manager for runnables that all belong to `project_id`
    ///
    /// Fails without contacting the store when the configuration is invalid
    /// or any runnable belongs to another project.
    pub fn new(
        store: Arc<dyn RemoteJobStore>,
        runnables: Vec<Runnable>,
        project_id: impl Into<String>,
        config: ManagerConfig,
    ) -> Result<Self> {
        let project_id = project_id.into();
        config.validate()?;

        if let Some((index, stray)) = runnables
            .iter()
            .enumerate()
            .find(|(_, runnable)| runnable.project_id != project_id)
        {
            return Err(ManagerError::MixedProjects {
                expected: project_id,
                found: stray.project_id.clone(),
                index,
            });
        }

        debug!(
            "Created manager for {} runnable(s) in project {}",
            runnables.len(),
            project_id
        );

        Ok(Self {
            store,
            runnables,
            project_id,
            config,
            state: LifecycleState::Initialized,
            status: StatusCache::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the cancellation token checked before every pooled task and poll
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    // =============================================================================
    // Accessors
    // =============================================================================

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.state
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Token that aborts the current run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The managed runnables
    ///
    /// Holding this borrow prevents any lifecycle call until it ends.
    pub fn get_runnables(&self) -> &[Runnable] {
        &self.runnables
    }

    /// Gives the runnables back to the caller
    pub fn into_runnables(self) -> Vec<Runnable> {
        self.runnables
    }

    /// Copy of the latest status snapshot
    pub fn get_latest_statuses(&self) -> StatusSnapshot {
        self.status.latest()
    }

    /// Handle for reading statuses from other tasks while a run is in progress
    pub fn status_reader(&self) -> StatusReader {
        self.status.reader()
    }

    // =============================================================================
    // Lifecycle
    // =============================================================================

    /// Submits, waits for every runnable to finish, then fetches results
    pub async fn run(&mut self, fetch_children: bool) -> Result<()> {
        info!(
            "Running {} runnable(s) in project {}",
            self.runnables.len(),
            self.project_id
        );

        self.submit().await?;
        self.wait_for_completion().await?;
        self.get_results(fetch_children).await?;

        info!("Run finished: {}", self.status.latest());
        Ok(())
    }

    /// Inserts every runnable into the backend in chunks
    ///
    /// Chunks are contiguous and hold at most `chunk_size` runnables. Summaries
    /// are written back in request order. When some chunks fail after others
    /// were accepted, the configured [`PartialSubmissionPolicy`] applies and
    /// [`ManagerError::PartialSubmission`] is returned.
    pub async fn submit(&mut self) -> Result<()> {
        self.expect_state("submit", LifecycleState::Initialized)?;

        let chunk_size = self.config.chunk_size;
        let total = self.runnables.len();
        let chunks: Vec<Vec<JsonValue>> = self
            .runnables
            .chunks(chunk_size)
            .map(|chunk| chunk.iter().map(|r| r.params.clone()).collect())
            .collect();

        let pool = WorkerPool::new(
            self.config.submit_pool_size(chunks.len()),
            self.cancel.clone(),
        );
        info!(
            "Submitting {} runnable(s) in {} chunk(s) with {} worker(s)",
            total,
            chunks.len(),
            pool.max_workers()
        );

        let tasks: Vec<_> = chunks
            .into_iter()
            .enumerate()
            .map(|(chunk, params)| {
                let store = Arc::clone(&self.store);
                let project_id = self.project_id.clone();
                move || async move {
                    let expected = params.len();
                    debug!("Inserting chunk {} ({} runnables)", chunk, expected);

                    let summaries = store.insert_many(&project_id, params).await?;
                    if summaries.len() != expected {
                        return Err(ManagerError::ResponseLengthMismatch {
                            chunk,
                            expected,
                            actual: summaries.len(),
                        });
                    }
                    Ok(summaries)
                }
            })
            .collect();

        let outcomes = pool.run_all(tasks).await;

        let mut submitted = 0;
        let mut failure = None;
        for (idx, (chunk, outcome)) in self
            .runnables
            .chunks_mut(chunk_size)
            .zip(outcomes)
            .enumerate()
        {
            match outcome {
                Ok(summaries) => {
                    for (runnable, summary) in chunk.iter_mut().zip(summaries) {
                        runnable.apply_summary(summary);
                    }
                    submitted += chunk.len();
                }
                Err(e) => {
                    error!("Chunk {} failed: {}", idx, e);
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            None => {
                self.mark_submitted();
                Ok(())
            }
            Some(e) if submitted == 0 => Err(e),
            Some(e) => self.handle_partial_submission(submitted, total, e).await,
        }
    }

    /// Refreshes every runnable's state with one store query
    ///
    /// A no-op before submission and after completion. Moves to COMPLETED
    /// once every submitted runnable is terminal.
    pub async fn update_state(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Initialized => {
                debug!("Nothing submitted yet, skipping state update");
                return Ok(());
            }
            LifecycleState::Completed => return Ok(()),
            LifecycleState::Submitted => {}
        }

        let mut states = self.store.get_states(&self.project_id).await?;

        let mut missing = 0;
        for runnable in self.runnables.iter_mut() {
            let Some(uuid) = runnable.uuid else {
                continue;
            };
            match states.remove(&uuid) {
                Some(summary) => runnable.apply_summary(summary),
                None => missing += 1,
            }
        }
        if missing > 0 {
            warn!(
                "{} submitted runnable(s) missing from the state response for project {}",
                missing, self.project_id
            );
        }

        let all_terminal = self
            .runnables
            .iter()
            .filter(|r| r.is_submitted())
            .all(Runnable::is_terminal);

        self.refresh_status();

        if all_terminal {
            self.transition(LifecycleState::Completed);
        }

        Ok(())
    }

    /// Polls until every submitted runnable is terminal
    ///
    /// Waits between polls according to the configured poll policy. Fails
    /// with [`ManagerError::PollTimeout`] past the policy's maximum wait and
    /// with [`ManagerError::Cancelled`] when the token fires.
    pub async fn wait_for_completion(&mut self) -> Result<()> {
        if self.state == LifecycleState::Initialized {
            return Err(self.invalid_transition("wait for completion"));
        }

        let started = Instant::now();
        let mut interval = self.config.poll.initial_interval;
        let mut round = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(ManagerError::Cancelled);
            }

            self.update_state().await?;
            round += 1;

            if self.state == LifecycleState::Completed {
                info!("All runnables terminal after {} poll(s)", round);
                return Ok(());
            }

            let mut delay = interval;
            if let Some(max_wait) = self.config.poll.max_wait {
                let waited = started.elapsed();
                if waited >= max_wait {
                    warn!("Giving up after {:?} and {} poll(s)", waited, round);
                    return Err(ManagerError::PollTimeout { waited });
                }
                delay = delay.min(max_wait - waited);
            }

            debug!(
                "Poll {}: {}; next poll in {:?}",
                round,
                self.status.latest(),
                delay
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(ManagerError::Cancelled),
                _ = time::sleep(delay) => {}
            }

            interval = self.config.poll.next_interval(interval);
        }
    }

    /// Fetches the results of every submitted runnable
    ///
    /// Only valid once COMPLETED. With `fetch_children`, child results are
    /// fetched too unless the backend reported no children. Results that
    /// arrived are kept even when other fetches fail; the first failure is
    /// returned. Runnables that already hold a result are not fetched again,
    /// so calling this after a failure only retries the missing ones.
    pub async fn get_results(&mut self, fetch_children: bool) -> Result<()> {
        self.expect_state("get results", LifecycleState::Completed)?;

        let targets: Vec<(usize, StateSummary)> = self
            .runnables
            .iter()
            .enumerate()
            .filter(|(_, runnable)| runnable.result.is_none())
            .filter_map(|(idx, runnable)| runnable.summary.clone().map(|s| (idx, s)))
            .collect();

        let pool = WorkerPool::new(self.config.result_pool_size(), self.cancel.clone());
        info!(
            "Fetching results for {} runnable(s) with {} worker(s)",
            targets.len(),
            pool.max_workers()
        );

        let tasks: Vec<_> = targets
            .iter()
            .map(|(_, summary)| {
                let store = Arc::clone(&self.store);
                let summary = summary.clone();
                move || async move { fetch_result(store.as_ref(), &summary, fetch_children).await }
            })
            .collect();

        let outcomes = pool.run_all(tasks).await;

        let mut incomplete = 0;
        let mut failure = None;
        for ((idx, summary), outcome) in targets.into_iter().zip(outcomes) {
            match outcome {
                Ok(bundle) => {
                    if !bundle.is_complete() {
                        incomplete += 1;
                    }
                    self.runnables[idx].result = Some(bundle);
                }
                Err(e) => {
                    error!("Fetching results for {} failed: {}", summary.uuid, e);
                    failure.get_or_insert(e);
                }
            }
        }

        if incomplete > 0 {
            warn!("{} result bundle(s) have missing parts", incomplete);
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // =============================================================================
    // Internals
    // =============================================================================

    async fn handle_partial_submission(
        &mut self,
        submitted: usize,
        total: usize,
        cause: ManagerError,
    ) -> Result<()> {
        let rolled_back = match self.config.partial_submission {
            PartialSubmissionPolicy::LeaveInPlace => {
                warn!(
                    "Partial submission: {} of {} runnable(s) accepted, leaving them in place",
                    submitted, total
                );
                self.mark_submitted();
                false
            }
            PartialSubmissionPolicy::RollBack => {
                let uuids: Vec<Uuid> = self.runnables.iter().filter_map(|r| r.uuid).collect();
                warn!(
                    "Partial submission: rolling back {} of {} runnable(s)",
                    uuids.len(),
                    total
                );

                if let Err(e) = self.store.delete_many(&self.project_id, uuids).await {
                    error!("Rollback failed, keeping submitted runnables: {}", e);
                    self.mark_submitted();
                    return Err(ManagerError::RollbackFailed {
                        submitted,
                        total,
                        source: e,
                    });
                }

                for runnable in self.runnables.iter_mut() {
                    runnable.reset_submission();
                }
                true
            }
        };

        Err(ManagerError::PartialSubmission {
            submitted,
            total,
            rolled_back,
            source: Box::new(cause),
        })
    }

    fn mark_submitted(&mut self) {
        self.refresh_status();
        self.transition(LifecycleState::Submitted);
    }

    fn refresh_status(&self) {
        self.status
            .replace(StatusSnapshot::from_runnables(&self.runnables));
    }

    fn transition(&mut self, next: LifecycleState) {
        info!("Project {}: {} -> {}", self.project_id, self.state, next);
        self.state = next;
    }

    fn expect_state(&self, operation: &'static str, expected: LifecycleState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_transition(operation))
        }
    }

    fn invalid_transition(&self, operation: &'static str) -> ManagerError {
        error!("Cannot {} while {}", operation, self.state);
        ManagerError::InvalidLifecycleTransition {
            operation,
            state: self.state,
        }
    }
}

async fn fetch_result(
    store: &dyn RemoteJobStore,
    summary: &StateSummary,
    fetch_children: bool,
) -> Result<ResultBundle> {
    let bundle = store.get_results(summary).await?;

    if fetch_children && summary.may_have_children() {
        let children = store.get_child_results(summary).await?;
        return Ok(bundle.with_children(children));
    }

    Ok(bundle)
}
