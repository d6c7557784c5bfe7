//! Service layer
//!
//! Shared state the manager exposes to other tasks. The status cache is the
//! only piece of manager state that may be read while a run is in progress.

mod status_cache;

pub use status_cache::{StatusCache, StatusReader};
