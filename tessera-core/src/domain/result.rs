//! Result domain types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Results retrieved for one runnable
///
/// A `None` part means the backend has not produced that part yet. This is
/// not an error; callers check for absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub uuid: Uuid,

    #[serde(default)]
    pub parts: Vec<Option<JsonValue>>,

    /// Child-record results, `None` when children were not requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ResultBundle>>,
}

impl ResultBundle {
    pub fn new(uuid: Uuid, parts: Vec<Option<JsonValue>>) -> Self {
        Self {
            uuid,
            parts,
            children: None,
        }
    }

    /// Attaches child results, replacing any previously attached
    pub fn with_children(mut self, children: Vec<ResultBundle>) -> Self {
        self.children = Some(children);
        self
    }

    /// Indices of parts the backend has not filled in yet
    pub fn missing_parts(&self) -> Vec<usize> {
        self.parts
            .iter()
            .enumerate()
            .filter(|(_, part)| part.is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// True when every part is present
    pub fn is_complete(&self) -> bool {
        self.parts.iter().all(Option::is_some)
    }
}
