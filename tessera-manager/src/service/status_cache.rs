//! Status cache
//!
//! Holds the latest status snapshot of a managed batch. The manager builds a
//! whole new snapshot after every submit or poll round and swaps it in under
//! the lock; readers copy the current snapshot out. A half-updated snapshot
//! is never observable.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tessera_core::domain::status::StatusSnapshot;

/// Thread-safe holder of the latest status snapshot
///
/// Uses `Arc<Mutex<StatusSnapshot>>` so read handles can be given to other
/// tasks and threads.
#[derive(Debug, Clone, Default)]
pub struct StatusCache {
    inner: Arc<Mutex<StatusSnapshot>>,
}

impl StatusCache {
    /// Creates a cache holding the empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current snapshot
    pub fn replace(&self, snapshot: StatusSnapshot) {
        *self.lock() = snapshot;
    }

    /// Returns a copy of the current snapshot
    pub fn latest(&self) -> StatusSnapshot {
        self.lock().clone()
    }

    /// Returns a handle that can only read this cache
    pub fn reader(&self) -> StatusReader {
        StatusReader {
            cache: self.clone(),
        }
    }

    // Snapshots are only ever swapped whole, so a poisoned lock still holds
    // a consistent value.
    fn lock(&self) -> MutexGuard<'_, StatusSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read-only handle to a manager's status cache
///
/// Cheap to clone and safe to use from any task or thread, including while
/// the manager is running.
#[derive(Debug, Clone)]
pub struct StatusReader {
    cache: StatusCache,
}

impl StatusReader {
    /// Returns a copy of the latest snapshot
    pub fn latest(&self) -> StatusSnapshot {
        self.cache.latest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera_core::domain::runnable::Runnable;
    use tessera_core::domain::state::{CalcState, StateSummary};
    use uuid::Uuid;

    fn snapshot_of(states: &[CalcState]) -> StatusSnapshot {
        let runnables: Vec<Runnable> = states
            .iter()
            .map(|state| {
                let mut runnable = Runnable::new("p1", json!({}));
                runnable.apply_summary(StateSummary::new(Uuid::new_v4(), *state));
                runnable
            })
            .collect();
        StatusSnapshot::from_runnables(&runnables)
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache = StatusCache::new();
        assert_eq!(cache.latest(), StatusSnapshot::empty());
    }

    #[test]
    fn test_reader_sees_replacements() {
        let cache = StatusCache::new();
        let reader = cache.reader();

        let snapshot = snapshot_of(&[CalcState::Pending, CalcState::Running]);
        cache.replace(snapshot.clone());

        assert_eq!(reader.latest(), snapshot);
    }

    #[test]
    fn test_copies_are_independent() {
        let cache = StatusCache::new();
        cache.replace(snapshot_of(&[CalcState::Completed]));

        let mut copy = cache.latest();
        copy.get_mut(CalcState::Completed).clear();

        assert_eq!(copy.count(CalcState::Completed), 0);
        assert_eq!(cache.latest().count(CalcState::Completed), 1);
    }

    #[test]
    fn test_readers_on_other_threads_never_see_torn_snapshots() {
        let cache = StatusCache::new();
        let reader = cache.reader();

        let handle = std::thread::spawn(move || {
            for _ in 0..1000 {
                let total = reader.latest().total();
                assert!(total == 0 || total == 4, "torn snapshot with {} entries", total);
            }
        });

        for _ in 0..200 {
            cache.replace(snapshot_of(&[
                CalcState::Pending,
                CalcState::Running,
                CalcState::Completed,
                CalcState::Failed,
            ]));
        }

        handle.join().unwrap();
    }
}
