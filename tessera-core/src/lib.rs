//! Tessera Core
//!
//! Core types shared by the Tessera job-store client and the lifecycle manager.
//!
//! This crate contains:
//! - Domain types: runnables, calculation states, result bundles, status snapshots
//! - DTOs: request bodies sent to the job backend

pub mod domain;
pub mod dto;
