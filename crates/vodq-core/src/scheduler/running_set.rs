//! Process-local "running set" per pool (spec §4.6, design notes): a hash
//! set of item ids currently executing, guarded by a plain `Mutex` since
//! membership checks never need to hold the lock across an `.await`.

use crate::store::ItemId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct RunningSet {
    inner: Arc<Mutex<HashSet<ItemId>>>,
}

/// Held by a spawned task for the lifetime of its stage execution; dropping
/// it (including on panic or early return) removes the id from the set —
/// the "deferred removal on task completion" discipline spec §4.6 requires.
pub struct RunningGuard {
    set: RunningSet,
    id: ItemId,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.set.inner.lock().unwrap().remove(&self.id);
    }
}

impl RunningSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to claim `id` for this pool. Returns `None` if it is already
    /// running (de-duplication across ticks, spec §4.6 point 1).
    pub fn try_claim(&self, id: ItemId) -> Option<RunningGuard> {
        let mut set = self.inner.lock().unwrap();
        if set.insert(id) {
            Some(RunningGuard {
                set: self.clone(),
                id,
            })
        } else {
            None
        }
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.inner.lock().unwrap().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive() {
        let set = RunningSet::new();
        let guard1 = set.try_claim(1);
        assert!(guard1.is_some());
        let guard2 = set.try_claim(1);
        assert!(guard2.is_none());
        assert!(set.contains(1));
    }

    #[test]
    fn drop_releases_the_slot() {
        let set = RunningSet::new();
        {
            let _guard = set.try_claim(5).unwrap();
            assert!(set.contains(5));
        }
        assert!(!set.contains(5));
        assert!(set.try_claim(5).is_some());
    }

    #[test]
    fn distinct_ids_do_not_conflict() {
        let set = RunningSet::new();
        let _a = set.try_claim(1).unwrap();
        let _b = set.try_claim(2).unwrap();
        assert_eq!(set.len(), 2);
    }
}
