//! Calculation state domain types
//!
//! The backend is authoritative for every runnable's state; these types
//! mirror what it reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-assigned state of a runnable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalcState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl CalcState {
    /// Every state, in canonical order
    pub const ALL: [CalcState; 4] = [
        CalcState::Pending,
        CalcState::Running,
        CalcState::Completed,
        CalcState::Failed,
    ];

    /// Whether the backend will never move a runnable out of this state
    pub fn is_terminal(self) -> bool {
        matches!(self, CalcState::Completed | CalcState::Failed)
    }

    /// Wire name of the state
    pub fn as_str(self) -> &'static str {
        match self {
            CalcState::Pending => "PENDING",
            CalcState::Running => "RUNNING",
            CalcState::Completed => "COMPLETED",
            CalcState::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for CalcState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend view of one runnable's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    /// Identifier assigned by the backend on insert
    pub uuid: Uuid,

    /// Current calculation state
    pub calc_state: CalcState,

    /// Number of child records the backend tracks for this runnable, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_count: Option<u32>,

    /// Failure description for FAILED runnables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Last time the backend changed this summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StateSummary {
    /// Creates a bare summary with only an identifier and a state
    pub fn new(uuid: Uuid, calc_state: CalcState) -> Self {
        Self {
            uuid,
            calc_state,
            child_count: None,
            error: None,
            updated_at: None,
        }
    }

    /// Whether child results are worth requesting
    ///
    /// An unreported child count is treated as "maybe".
    pub fn may_have_children(&self) -> bool {
        self.child_count != Some(0)
    }
}
