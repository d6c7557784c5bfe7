//! Runnable-related API endpoints

use crate::JobStoreClient;
use crate::error::Result;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tessera_core::domain::result::ResultBundle;
use tessera_core::domain::state::StateSummary;
use tessera_core::dto::runnable::{DeleteRunnables, InsertRunnables};
use uuid::Uuid;

impl JobStoreClient {
    // =============================================================================
    // Submission
    // =============================================================================

    /// Insert a batch of runnables into a project
    ///
    /// # Arguments
    /// * `project_id` - The project the runnables belong to
    /// * `requests` - Creation parameters, one per runnable
    ///
    /// # Returns
    /// One summary per request, in request order
    ///
    /// # Example
    /// ```no_run
    /// # use tessera_client::JobStoreClient;
    /// # use serde_json::json;
    /// # async fn example() -> tessera_client::Result<()> {
    /// let client = JobStoreClient::new("http://localhost:8080");
    /// let summaries = client
    ///     .insert_runnables("project-1", vec![json!({"propagator": "default"})])
    ///     .await?;
    /// assert_eq!(summaries.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn insert_runnables(
        &self,
        project_id: &str,
        requests: Vec<JsonValue>,
    ) -> Result<Vec<StateSummary>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/projects/{}/runnables", self.base_url, project_id);
        let body = InsertRunnables { requests };
        let response = self.send(|| self.client.post(&url).json(&body)).await?;

        self.handle_response(response).await
    }

    /// Delete runnables that were inserted into a project
    ///
    /// # Arguments
    /// * `project_id` - The project the runnables belong to
    /// * `uuids` - Identifiers returned by a previous insert
    pub async fn delete_runnables(&self, project_id: &str, uuids: Vec<Uuid>) -> Result<()> {
        if uuids.is_empty() {
            return Ok(());
        }

        let url = format!("{}/projects/{}/runnables/delete", self.base_url, project_id);
        let body = DeleteRunnables { uuids };
        let response = self.send(|| self.client.post(&url).json(&body)).await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // State Queries
    // =============================================================================

    /// Get the state of every runnable in a project
    ///
    /// # Returns
    /// Summaries keyed by runnable UUID
    pub async fn get_runnable_states(
        &self,
        project_id: &str,
    ) -> Result<HashMap<Uuid, StateSummary>> {
        let url = format!("{}/projects/{}/runnables/states", self.base_url, project_id);
        let response = self.send(|| self.client.get(&url)).await?;

        let summaries: Vec<StateSummary> = self.handle_response(response).await?;
        Ok(summaries
            .into_iter()
            .map(|summary| (summary.uuid, summary))
            .collect())
    }

    // =============================================================================
    // Results
    // =============================================================================

    /// Get the results of a runnable
    ///
    /// Parts the backend has not produced yet come back as `None`.
    pub async fn get_runnable_results(&self, uuid: Uuid) -> Result<ResultBundle> {
        let url = format!("{}/runnables/{}/results", self.base_url, uuid);
        let response = self.send(|| self.client.get(&url)).await?;

        self.handle_response(response).await
    }

    /// Get the results of every child record of a runnable
    pub async fn get_child_results(&self, uuid: Uuid) -> Result<Vec<ResultBundle>> {
        let url = format!("{}/runnables/{}/children/results", self.base_url, uuid);
        let response = self.send(|| self.client.get(&url)).await?;

        self.handle_response(response).await
    }
}
