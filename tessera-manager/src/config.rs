//! Manager configuration
//!
//! Defines the tunables of a lifecycle manager: submission chunking, worker
//! pool sizes, the poll backoff schedule and what to do when a submission
//! only partly succeeds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ManagerError, Result};

/// Largest number of runnables sent in one insert request
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Upper bound on concurrent insert requests
pub const DEFAULT_SUBMIT_WORKERS: usize = 10;

/// Concurrent result downloads
pub const DEFAULT_RESULT_WORKERS: usize = 5;

/// What to do with accepted chunks when a later chunk fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialSubmissionPolicy {
    /// Keep the accepted runnables and move on to SUBMITTED; the caller reconciles
    #[default]
    LeaveInPlace,

    /// Delete the accepted runnables and stay INITIALIZED
    RollBack,
}

/// Delay schedule between state polls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after the first unfinished poll
    pub initial_interval: Duration,

    /// Upper bound for the delay between polls
    pub max_interval: Duration,

    /// Factor applied to the delay after each unfinished poll, 1 keeps it fixed
    pub multiplier: u32,

    /// Give up waiting after this long
    pub max_wait: Option<Duration>,
}

impl PollPolicy {
    /// A constant delay between polls
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1,
            max_wait: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Delay to use after waiting `current`
    pub fn next_interval(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.multiplier)
            .min(self.max_interval)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2,
            max_wait: None,
        }
    }
}

/// Lifecycle manager configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Largest number of runnables per insert request
    pub chunk_size: usize,

    /// Upper bound on concurrent insert requests
    pub submit_workers: usize,

    /// Concurrent result downloads
    pub result_workers: usize,

    /// When false every pool runs a single worker, which keeps request
    /// order deterministic
    pub concurrency_enabled: bool,

    /// Delay schedule between state polls
    pub poll: PollPolicy,

    /// Handling of partly accepted submissions
    pub partial_submission: PartialSubmissionPolicy,
}

impl ManagerConfig {
    /// Creates a configuration with defaults
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            submit_workers: DEFAULT_SUBMIT_WORKERS,
            result_workers: DEFAULT_RESULT_WORKERS,
            concurrency_enabled: true,
            poll: PollPolicy::default(),
            partial_submission: PartialSubmissionPolicy::default(),
        }
    }

    /// Creates a configuration where every pool runs one worker
    pub fn sequential() -> Self {
        Self::new().with_concurrency(false)
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables, all optional:
    /// - TESSERA_CHUNK_SIZE (default: 500)
    /// - TESSERA_SUBMIT_WORKERS (default: 10)
    /// - TESSERA_RESULT_WORKERS (default: 5)
    /// - TESSERA_POLL_INTERVAL_MS (default: 1000)
    /// - TESSERA_MAX_POLL_INTERVAL_MS (default: 30000)
    /// - TESSERA_MAX_WAIT_SECS (default: unbounded)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::new();

        let config = Self {
            chunk_size: env_parse("TESSERA_CHUNK_SIZE")?.unwrap_or(defaults.chunk_size),
            submit_workers: env_parse("TESSERA_SUBMIT_WORKERS")?
                .unwrap_or(defaults.submit_workers),
            result_workers: env_parse("TESSERA_RESULT_WORKERS")?
                .unwrap_or(defaults.result_workers),
            poll: PollPolicy {
                initial_interval: env_parse("TESSERA_POLL_INTERVAL_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.poll.initial_interval),
                max_interval: env_parse("TESSERA_MAX_POLL_INTERVAL_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.poll.max_interval),
                max_wait: env_parse("TESSERA_MAX_WAIT_SECS")?.map(Duration::from_secs),
                ..defaults.poll
            },
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_concurrency(mut self, enabled: bool) -> Self {
        self.concurrency_enabled = enabled;
        self
    }

    pub fn with_workers(mut self, submit_workers: usize, result_workers: usize) -> Self {
        self.submit_workers = submit_workers;
        self.result_workers = result_workers;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_partial_submission(mut self, policy: PartialSubmissionPolicy) -> Self {
        self.partial_submission = policy;
        self
    }

    /// Worker count for a submission of `chunk_count` chunks
    pub fn submit_pool_size(&self, chunk_count: usize) -> usize {
        if self.concurrency_enabled {
            chunk_count.min(self.submit_workers).max(1)
        } else {
            1
        }
    }

    /// Worker count for result retrieval
    pub fn result_pool_size(&self) -> usize {
        if self.concurrency_enabled {
            self.result_workers
        } else {
            1
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size must be greater than 0"));
        }

        if self.submit_workers == 0 || self.result_workers == 0 {
            return Err(invalid("worker counts must be greater than 0"));
        }

        if self.poll.initial_interval.is_zero() {
            return Err(invalid("poll interval must be greater than 0"));
        }

        if self.poll.max_interval < self.poll.initial_interval {
            return Err(invalid("max poll interval must not be below the initial interval"));
        }

        if self.poll.multiplier == 0 {
            return Err(invalid("poll multiplier must be at least 1"));
        }

        Ok(())
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(message: &str) -> ManagerError {
    ManagerError::InvalidConfig(message.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ManagerError::InvalidConfig(format!("{} is not a valid value: {}", name, raw))
        }),
        Err(_) => Ok(None),
    }
}
