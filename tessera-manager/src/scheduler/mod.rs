//! Scheduler layer
//!
//! This layer drives a batch of runnables through submission, polling and
//! result retrieval, fanning store calls out over bounded worker pools.

pub mod lifecycle;
pub mod pool;

pub use lifecycle::{LifecycleManager, LifecycleState};
pub use pool::WorkerPool;
