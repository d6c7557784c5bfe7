//! Status snapshot
//!
//! A point-in-time grouping of runnable UUIDs by calculation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::runnable::Runnable;
use crate::domain::state::CalcState;

/// Runnable UUIDs grouped by calculation state
///
/// Always holds all four state keys. Each list keeps the order of the
/// runnables it was built from, and the lists are disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    by_state: BTreeMap<CalcState, Vec<Uuid>>,

    /// When the snapshot was computed, `None` for the initial empty snapshot
    taken_at: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    /// The snapshot before anything has been submitted
    pub fn empty() -> Self {
        Self {
            by_state: CalcState::ALL
                .into_iter()
                .map(|state| (state, Vec::new()))
                .collect(),
            taken_at: None,
        }
    }

    /// Builds a snapshot from the current runnable states
    ///
    /// Runnables that were never submitted do not appear.
    pub fn from_runnables(runnables: &[Runnable]) -> Self {
        let mut snapshot = Self::empty();
        for runnable in runnables {
            if let (Some(uuid), Some(state)) = (runnable.uuid, runnable.calc_state) {
                snapshot.by_state.entry(state).or_default().push(uuid);
            }
        }
        snapshot.taken_at = Some(Utc::now());
        snapshot
    }

    /// UUIDs currently in `state`
    pub fn get(&self, state: CalcState) -> &[Uuid] {
        self.by_state.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of runnables in `state`
    pub fn count(&self, state: CalcState) -> usize {
        self.get(state).len()
    }

    /// Number of runnables across all states
    pub fn total(&self) -> usize {
        self.by_state.values().map(Vec::len).sum()
    }

    /// Number of runnables in a terminal state
    pub fn terminal(&self) -> usize {
        CalcState::ALL
            .into_iter()
            .filter(|state| state.is_terminal())
            .map(|state| self.count(state))
            .sum()
    }

    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }

    /// Iterates over every state and its UUIDs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (CalcState, &[Uuid])> {
        self.by_state
            .iter()
            .map(|(state, uuids)| (*state, uuids.as_slice()))
    }

    /// Mutable access to one state's list
    ///
    /// Snapshots handed out to callers are copies, so editing one never
    /// affects the manager.
    pub fn get_mut(&mut self, state: CalcState) -> &mut Vec<Uuid> {
        self.by_state.entry(state).or_default()
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (state, uuids) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", state, uuids.len())?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::StateSummary;
    use serde_json::json;

    fn submitted(state: CalcState) -> Runnable {
        let mut runnable = Runnable::new("p1", json!({}));
        runnable.apply_summary(StateSummary::new(Uuid::new_v4(), state));
        runnable
    }

    #[test]
    fn test_empty_snapshot_has_all_states() {
        let snapshot = StatusSnapshot::empty();
        assert_eq!(snapshot.iter().count(), 4);
        assert_eq!(snapshot.total(), 0);
        assert!(snapshot.taken_at().is_none());
    }

    #[test]
    fn test_from_runnables_groups_in_order() {
        let runnables = vec![
            submitted(CalcState::Running),
            submitted(CalcState::Completed),
            submitted(CalcState::Running),
            Runnable::new("p1", json!({})),
        ];

        let snapshot = StatusSnapshot::from_runnables(&runnables);
        assert_eq!(snapshot.total(), 3);
        assert_eq!(
            snapshot.get(CalcState::Running),
            &[runnables[0].uuid.unwrap(), runnables[2].uuid.unwrap()]
        );
        assert_eq!(snapshot.count(CalcState::Completed), 1);
        assert_eq!(snapshot.count(CalcState::Pending), 0);
        assert_eq!(snapshot.terminal(), 1);
        assert!(snapshot.taken_at().is_some());
    }

    #[test]
    fn test_display() {
        let snapshot = StatusSnapshot::from_runnables(&[submitted(CalcState::Failed)]);
        assert_eq!(
            snapshot.to_string(),
            "PENDING=0, RUNNING=0, COMPLETED=0, FAILED=1"
        );
    }
}
