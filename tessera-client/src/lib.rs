//! Tessera HTTP Client
//!
//! A simple, type-safe HTTP client for the job backend that runs Tessera
//! runnables.
//!
//! Every request goes through the same transport path: the bearer token is
//! attached when one is configured, and transient failures are retried
//! according to the client's [`RetryPolicy`] before an error is returned.
//!
//! # Example
//!
//! ```no_run
//! use tessera_client::JobStoreClient;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = JobStoreClient::new("http://localhost:8080").with_token("secret");
//!
//!     let summaries = client
//!         .insert_runnables("project-1", vec![json!({"epoch": "2026-01-01T00:00:00Z"})])
//!         .await?;
//!
//!     println!("Inserted {}", summaries[0].uuid);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod retry;
mod runnables;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use retry::RetryPolicy;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// HTTP client for the job backend
#[derive(Debug, Clone)]
pub struct JobStoreClient {
    /// Base URL of the backend (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Bearer token attached to every request
    auth_token: Option<String>,
    /// Retry policy for transient failures
    retry: RetryPolicy,
}

impl JobStoreClient {
    /// Create a new job store client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the backend API (e.g., "http://localhost:8080")
    ///
    /// # Example
    /// ```
    /// use tessera_client::JobStoreClient;
    ///
    /// let client = JobStoreClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new job store client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use tessera_client::JobStoreClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = JobStoreClient::with_client("http://localhost:8080", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            auth_token: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get the base URL of the backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the retry policy in use
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // =============================================================================
    // Transport
    // =============================================================================

    /// Send a request, retrying transient failures
    ///
    /// `build` is called once per attempt since a request builder cannot be
    /// reused after sending. When the attempts run out on a retryable status,
    /// the last response is returned so the caller reports the real status.
    async fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Response> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut request = build();
            if let Some(token) = &self.auth_token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !self.retry.is_retryable_status(status) || !self.retry.should_retry(attempt)
                    {
                        return Ok(response);
                    }
                    warn!(
                        "Backend answered {} (attempt {}/{}), retrying",
                        status, attempt, self.retry.max_attempts
                    );
                }
                Err(e) if is_transient(&e) && self.retry.should_retry(attempt) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}, retrying",
                        attempt, self.retry.max_attempts, e
                    );
                }
                Err(e) => return Err(e.into()),
            }

            let delay = self.retry.backoff_for(attempt);
            debug!("Retrying in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    async fn handle_empty_response(&self, response: Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

/// Connection failures and timeouts are worth another attempt
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}
