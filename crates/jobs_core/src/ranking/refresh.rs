//! Debounce table for board refreshes
//!
//! Maps a target to the instant its refresh becomes due. Scheduling a target
//! that is already pending is a no-op, so a burst of changes produces one
//! refresh.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct RefreshQueue<K> {
    delay_ms: i64,
    pending: HashMap<K, i64>,
}

impl<K> RefreshQueue<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(delay_ms: i64) -> Self {
        Self { delay_ms: delay_ms.max(0), pending: HashMap::new() }
    }

    pub fn delay_ms(&self) -> i64 {
        self.delay_ms
    }

    /// Returns false if a refresh for `target` is already pending.
    pub fn schedule(&mut self, target: K, now_ms: i64) -> bool {
        if self.pending.contains_key(&target) {
            return false;
        }
        self.pending.insert(target, now_ms.saturating_add(self.delay_ms));
        true
    }

    pub fn is_pending(&self, target: &K) -> bool {
        self.pending.contains_key(target)
    }

    pub fn cancel(&mut self, target: &K) -> bool {
        self.pending.remove(target).is_some()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every target whose refresh is due at `now_ms`
    pub fn drain_due(&mut self, now_ms: i64) -> Vec<K> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, &at)| at <= now_ms)
            .map(|(target, _)| target.clone())
            .collect();
        for target in &due {
            self.pending.remove(target);
        }
        due
    }
}
