//! Runnable domain model
//!
//! A runnable is one unit of remote work. It is created locally with opaque
//! parameters and acquires a UUID, a state and eventually a result as the
//! lifecycle manager drives it.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domain::result::ResultBundle;
use crate::domain::state::{CalcState, StateSummary};

/// A unit of remote work tracked by UUID and calculation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runnable {
    /// Project this runnable belongs to
    pub project_id: String,

    /// Creation parameters, passed to the backend unexamined
    pub params: JsonValue,

    /// Backend identifier, absent until submitted
    pub uuid: Option<Uuid>,

    /// Last state observed for this runnable, absent until submitted
    pub calc_state: Option<CalcState>,

    /// Latest summary reported by the backend
    pub summary: Option<StateSummary>,

    /// Results, populated once after a terminal state is observed
    pub result: Option<ResultBundle>,
}

impl Runnable {
    /// Creates an unsubmitted runnable
    pub fn new(project_id: impl Into<String>, params: JsonValue) -> Self {
        Self {
            project_id: project_id.into(),
            params,
            uuid: None,
            calc_state: None,
            summary: None,
            result: None,
        }
    }

    /// Whether the backend has accepted this runnable
    pub fn is_submitted(&self) -> bool {
        self.uuid.is_some()
    }

    /// Whether the last observed state is terminal
    pub fn is_terminal(&self) -> bool {
        self.calc_state.is_some_and(CalcState::is_terminal)
    }

    /// Records a summary returned by the backend
    pub fn apply_summary(&mut self, summary: StateSummary) {
        self.uuid = Some(summary.uuid);
        self.calc_state = Some(summary.calc_state);
        self.summary = Some(summary);
    }

    /// Clears everything learned from the backend
    pub fn reset_submission(&mut self) {
        self.uuid = None;
        self.calc_state = None;
        self.summary = None;
        self.result = None;
    }
}
