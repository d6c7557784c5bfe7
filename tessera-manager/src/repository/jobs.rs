//! Job store repository
//!
//! Handles communication with the backend for runnable operations:
//! - Bulk inserting runnables
//! - Querying the state of every runnable in a project
//! - Fetching results and child results
//! - Deleting runnables when a partial submission is rolled back
//!
//! Implementations are expected to retry transient transport failures
//! themselves; the manager never retries a store call.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tessera_client::{JobStoreClient, Result};
use tessera_core::domain::result::ResultBundle;
use tessera_core::domain::state::StateSummary;
use uuid::Uuid;

/// Repository trait for runnable operations against the backend
#[async_trait]
pub trait RemoteJobStore: Send + Sync {
    /// Inserts runnables into a project
    ///
    /// Returns one summary per request, in request order. Fails as a whole
    /// when the backend rejects the request.
    ///
    /// # Arguments
    /// * `project_id` - The project the runnables belong to
    /// * `params` - Opaque creation parameters, one per runnable
    async fn insert_many(
        &self,
        project_id: &str,
        params: Vec<JsonValue>,
    ) -> Result<Vec<StateSummary>>;

    /// Fetches the current state of every runnable the backend knows for a project
    async fn get_states(&self, project_id: &str) -> Result<HashMap<Uuid, StateSummary>>;

    /// Fetches the results of one runnable
    ///
    /// Parts that are not available yet are `None` rather than an error.
    async fn get_results(&self, summary: &StateSummary) -> Result<ResultBundle>;

    /// Fetches the results of a runnable's child records
    async fn get_child_results(&self, summary: &StateSummary) -> Result<Vec<ResultBundle>>;

    /// Deletes runnables from a project
    async fn delete_many(&self, project_id: &str, uuids: Vec<Uuid>) -> Result<()>;
}

#[async_trait]
impl RemoteJobStore for JobStoreClient {
    async fn insert_many(
        &self,
        project_id: &str,
        params: Vec<JsonValue>,
    ) -> Result<Vec<StateSummary>> {
        self.insert_runnables(project_id, params).await
    }

    async fn get_states(&self, project_id: &str) -> Result<HashMap<Uuid, StateSummary>> {
        self.get_runnable_states(project_id).await
    }

    async fn get_results(&self, summary: &StateSummary) -> Result<ResultBundle> {
        self.get_runnable_results(summary.uuid).await
    }

    async fn get_child_results(&self, summary: &StateSummary) -> Result<Vec<ResultBundle>> {
        JobStoreClient::get_child_results(self, summary.uuid).await
    }

    async fn delete_many(&self, project_id: &str, uuids: Vec<Uuid>) -> Result<()> {
        self.delete_runnables(project_id, uuids).await
    }
}
