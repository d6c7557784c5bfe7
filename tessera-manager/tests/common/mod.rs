//! Scripted in-memory job store shared by the lifecycle tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tessera_client::{ClientError, Result};
use tessera_core::domain::result::ResultBundle;
use tessera_core::domain::runnable::Runnable;
use tessera_core::domain::state::{CalcState, StateSummary};
use tessera_manager::{ManagerConfig, PollPolicy, RemoteJobStore};
use uuid::Uuid;

/// Installs a test log subscriber once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Runnables whose params carry their position, `{"index": i}`
pub fn indexed_runnables(project_id: &str, count: usize) -> Vec<Runnable> {
    (0..count)
        .map(|index| Runnable::new(project_id, json!({ "index": index })))
        .collect()
}

/// Reads back the position stored by [`indexed_runnables`]
pub fn index_of(params: &JsonValue) -> usize {
    params["index"].as_u64().expect("indexed params") as usize
}

/// Configuration with a short poll interval
pub fn fast_config() -> ManagerConfig {
    ManagerConfig::default().with_poll_policy(PollPolicy::fixed(Duration::from_millis(1)))
}

/// A job store driven by a script of per-poll states
///
/// Every inserted runnable starts PENDING. Each `get_states` call consumes the
/// next script round (states by runnable index); once the script has one
/// round left, that round repeats forever. An empty script reports
/// COMPLETED for everything.
#[derive(Default)]
pub struct ScriptedStore {
    script: Mutex<VecDeque<Vec<CalcState>>>,
    inserted: Mutex<HashMap<Uuid, usize>>,
    insert_calls: Mutex<Vec<Vec<usize>>>,
    state_calls: AtomicUsize,
    result_calls: Mutex<Vec<Uuid>>,
    child_calls: Mutex<Vec<Uuid>>,
    delete_calls: Mutex<Vec<Vec<Uuid>>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,

    /// Inserts of chunks containing this index fail
    pub fail_insert_at: Option<usize>,
    /// Result fetches for this index fail
    pub fail_results_at: Option<usize>,
    /// Deletes fail
    pub fail_delete: bool,
    /// Child count reported for every runnable
    pub child_count: Option<u32>,
    /// Artificial latency for insert and result calls
    pub latency: Duration,
    /// Drop this many summaries from every insert response
    pub short_insert_response: usize,
    /// Leave this index out of every state response
    pub omit_from_states: Option<usize>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(rounds: Vec<Vec<CalcState>>) -> Self {
        let store = Self::new();
        *store.script.lock().unwrap() = rounds.into();
        store
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_insert_at(mut self, index: usize) -> Self {
        self.fail_insert_at = Some(index);
        self
    }

    pub fn failing_results_at(mut self, index: usize) -> Self {
        self.fail_results_at = Some(index);
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn with_child_count(mut self, child_count: u32) -> Self {
        self.child_count = Some(child_count);
        self
    }

    pub fn with_short_insert_response(mut self, dropped: usize) -> Self {
        self.short_insert_response = dropped;
        self
    }

    pub fn omitting_from_states(mut self, index: usize) -> Self {
        self.omit_from_states = Some(index);
        self
    }

    /// Indices sent in each insert call, in call order
    pub fn insert_calls(&self) -> Vec<Vec<usize>> {
        self.insert_calls.lock().unwrap().clone()
    }

    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }

    pub fn result_calls(&self) -> Vec<Uuid> {
        self.result_calls.lock().unwrap().clone()
    }

    pub fn child_calls(&self) -> Vec<Uuid> {
        self.child_calls.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> Vec<Vec<Uuid>> {
        self.delete_calls.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Total number of store calls of any kind
    pub fn total_calls(&self) -> usize {
        self.insert_calls.lock().unwrap().len()
            + self.state_calls()
            + self.result_calls.lock().unwrap().len()
            + self.child_calls.lock().unwrap().len()
            + self.delete_calls.lock().unwrap().len()
    }

    fn index_for(&self, uuid: Uuid) -> Option<usize> {
        self.inserted.lock().unwrap().get(&uuid).copied()
    }

    fn summary(&self, uuid: Uuid, calc_state: CalcState) -> StateSummary {
        let mut summary = StateSummary::new(uuid, calc_state);
        summary.child_count = self.child_count;
        summary
    }

    async fn simulate_latency(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteJobStore for ScriptedStore {
    async fn insert_many(
        &self,
        _project_id: &str,
        params: Vec<JsonValue>,
    ) -> Result<Vec<StateSummary>> {
        let indices: Vec<usize> = params.iter().map(index_of).collect();
        self.insert_calls.lock().unwrap().push(indices.clone());
        self.simulate_latency().await;

        if let Some(bad) = self.fail_insert_at {
            if indices.contains(&bad) {
                return Err(ClientError::api_error(500, "insert rejected"));
            }
        }

        let mut summaries = Vec::with_capacity(indices.len());
        let mut inserted = self.inserted.lock().unwrap();
        for index in indices {
            let uuid = Uuid::new_v4();
            inserted.insert(uuid, index);
            summaries.push(self.summary(uuid, CalcState::Pending));
        }
        summaries.truncate(summaries.len() - self.short_insert_response.min(summaries.len()));

        Ok(summaries)
    }

    async fn get_states(&self, _project_id: &str) -> Result<HashMap<Uuid, StateSummary>> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);

        let round = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        let inserted = self.inserted.lock().unwrap().clone();
        Ok(inserted
            .into_iter()
            .filter(|(_, index)| Some(*index) != self.omit_from_states)
            .map(|(uuid, index)| {
                let state = round
                    .as_ref()
                    .and_then(|states| states.get(index).copied())
                    .unwrap_or(CalcState::Completed);
                (uuid, self.summary(uuid, state))
            })
            .collect())
    }

    async fn get_results(&self, summary: &StateSummary) -> Result<ResultBundle> {
        self.result_calls.lock().unwrap().push(summary.uuid);
        self.simulate_latency().await;

        let index = self.index_for(summary.uuid);
        if index.is_some() && index == self.fail_results_at {
            return Err(ClientError::api_error(502, "results unavailable"));
        }

        Ok(ResultBundle::new(
            summary.uuid,
            vec![Some(json!({ "index": index })), None],
        ))
    }

    async fn get_child_results(&self, summary: &StateSummary) -> Result<Vec<ResultBundle>> {
        self.child_calls.lock().unwrap().push(summary.uuid);
        Ok(vec![ResultBundle::new(Uuid::new_v4(), vec![Some(json!("child"))])])
    }

    async fn delete_many(&self, _project_id: &str, uuids: Vec<Uuid>) -> Result<()> {
        self.delete_calls.lock().unwrap().push(uuids);
        if self.fail_delete {
            return Err(ClientError::api_error(500, "delete rejected"));
        }
        Ok(())
    }
}
