//! Error types for the lifecycle manager

use std::time::Duration;
use tessera_client::ClientError;
use thiserror::Error;

use crate::scheduler::LifecycleState;

/// Result type alias for manager operations
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Errors returned by the lifecycle manager
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The runnable set spans more than one project
    #[error("runnable {index} belongs to project '{found}', expected '{expected}'")]
    MixedProjects {
        expected: String,
        found: String,
        index: usize,
    },

    /// Configuration values are out of range
    #[error("invalid manager configuration: {0}")]
    InvalidConfig(String),

    /// A lifecycle operation was called from the wrong state
    #[error("cannot {operation} while the manager is {state}")]
    InvalidLifecycleTransition {
        operation: &'static str,
        state: LifecycleState,
    },

    /// A job store call failed after the transport gave up retrying
    #[error("job store request failed: {0}")]
    Store(#[from] ClientError),

    /// The backend answered an insert with the wrong number of summaries
    #[error("chunk {chunk}: backend returned {actual} summaries for {expected} requests")]
    ResponseLengthMismatch {
        chunk: usize,
        expected: usize,
        actual: usize,
    },

    /// Some submission chunks failed after others were accepted
    #[error("submitted {submitted} of {total} runnables before a chunk failed: {source}")]
    PartialSubmission {
        submitted: usize,
        total: usize,
        /// The accepted runnables were deleted again
        rolled_back: bool,
        #[source]
        source: Box<ManagerError>,
    },

    /// Deleting a partial submission failed, the inserted runnables remain
    #[error("could not roll back {submitted} of {total} submitted runnables: {source}")]
    RollbackFailed {
        submitted: usize,
        total: usize,
        #[source]
        source: ClientError,
    },

    /// Polling exceeded the configured maximum wait
    #[error("runnables still not terminal after {waited:?}")]
    PollTimeout { waited: Duration },

    /// The cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// A pooled worker task panicked
    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),
}

impl ManagerError {
    /// Whether the error reports misuse of the manager rather than a failure
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(self, Self::InvalidLifecycleTransition { .. })
    }

    /// Whether the backend holds runnables from a submission that did not
    /// fully go through
    pub fn may_leave_remote_state(&self) -> bool {
        match self {
            Self::PartialSubmission { rolled_back, .. } => !rolled_back,
            Self::RollbackFailed { .. } => true,
            _ => false,
        }
    }
}
