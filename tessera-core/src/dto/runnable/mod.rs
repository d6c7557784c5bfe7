//! Runnable DTOs

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Request to insert a batch of runnables into a project
///
/// The backend answers with one summary per request, in request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertRunnables {
    pub requests: Vec<JsonValue>,
}

/// Request to delete previously inserted runnables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRunnables {
    pub uuids: Vec<Uuid>,
}
