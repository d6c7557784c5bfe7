//! Data Transfer Objects for the job backend
//!
//! Request bodies sent by the client. Responses reuse the domain types
//! directly since they are what the backend returns.

pub mod runnable;
