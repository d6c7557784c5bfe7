//! Core domain types
//!
//! This module contains the domain structures shared between the HTTP client
//! (which receives them from the backend) and the lifecycle manager (which
//! mirrors them locally while driving a batch of runnables).

pub mod result;
pub mod runnable;
pub mod state;
pub mod status;
