//! Tessera Manager
//!
//! Client-side orchestration of long-running remote computations.
//!
//! A [`LifecycleManager`] owns a set of runnables bound to one project and
//! takes them through submission, polling and result retrieval against a
//! [`RemoteJobStore`], fanning store calls out over bounded worker pools.
//!
//! Architecture:
//! - Configuration: chunking, pool sizes, poll backoff, partial-submission policy
//! - Repository: the job store trait and its HTTP implementation
//! - Service: the status cache readable while a run is in progress
//! - Scheduler: the worker pool and the lifecycle state machine
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use tessera_client::JobStoreClient;
//! use tessera_core::domain::runnable::Runnable;
//! use tessera_manager::{LifecycleManager, ManagerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(JobStoreClient::new("http://localhost:8080").with_token("secret"));
//!     let runnables = (0..1200)
//!         .map(|i| Runnable::new("project-1", json!({ "case": i })))
//!         .collect();
//!
//!     let mut manager =
//!         LifecycleManager::new(store, runnables, "project-1", ManagerConfig::default())?;
//!     let statuses = manager.status_reader();
//!
//!     let progress = tokio::spawn(async move {
//!         loop {
//!             tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!             println!("{}", statuses.latest());
//!         }
//!     });
//!
//!     manager.run(true).await?;
//!     progress.abort();
//!
//!     for runnable in manager.get_runnables() {
//!         println!("{:?}: {:?}", runnable.uuid, runnable.calc_state);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod repository;
pub mod scheduler;
pub mod service;

pub use config::{ManagerConfig, PartialSubmissionPolicy, PollPolicy};
pub use error::{ManagerError, Result};
pub use repository::RemoteJobStore;
pub use scheduler::{LifecycleManager, LifecycleState, WorkerPool};
pub use service::{StatusCache, StatusReader};
pub use tokio_util::sync::CancellationToken;
