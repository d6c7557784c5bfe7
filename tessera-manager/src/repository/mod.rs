//! Repository layer
//!
//! The job store is the manager's only view of the backend. It is
//! trait-based so the manager can be driven against the HTTP client in
//! production and against scripted stores in tests.

mod jobs;

// Re-export the trait
pub use jobs::RemoteJobStore;
