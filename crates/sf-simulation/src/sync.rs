//! Shared accumulators safe to touch from any worker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// A counter shared between workers.
#[derive(Debug, Default)]
pub struct SyncCounter(AtomicU64);

impl SyncCounter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one and return the new value.
    pub fn increment(&self) -> u64 {
        self.add(1)
    }

    /// Add `n` and return the new value.
    pub fn add(&self, n: u64) -> u64 {
        self.0.fetch_add(n, Ordering::AcqRel) + n
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Set back to zero, returning the value it held.
    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::AcqRel)
    }
}

/// An ordered map behind a read/write lock.
///
/// Readers get clones, never references into the map, and iteration runs
/// over a point-in-time snapshot so callbacks never hold the lock. A lock
/// poisoned by a panicking writer is recovered rather than propagated.
#[derive(Debug)]
pub struct SyncMap<K, V> {
    inner: RwLock<BTreeMap<K, V>>,
}

impl<K, V> Default for SyncMap<K, V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K: Ord + Clone, V: Clone> SyncMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, returning the previous value.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value)
    }

    /// Clone of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Value under `key`, inserting `make()` first if absent.
    pub fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> V {
        if let Some(v) = self.get(&key) {
            return v;
        }
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(make)
            .clone()
    }

    /// Remove `key`, returning its value.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Cloned entries in key order, taken under a single read lock.
    pub fn snapshot(&self) -> Vec<(K, V)> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Visit a snapshot of every entry without holding the lock.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        for (k, v) in self.snapshot() {
            f(&k, &v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counter_increment_get_reset() {
        let counter = SyncCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.add(4), 5);
        assert_eq!(counter.get(), 5);
        assert_eq!(counter.reset(), 5);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn counter_is_shared_across_threads() {
        let counter = Arc::new(SyncCounter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        c.increment();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.get(), 8000);
    }

    #[test]
    fn map_set_get_delete() {
        let map = SyncMap::new();
        assert!(map.set("a", 1).is_none());
        assert_eq!(map.set("a", 2), Some(1));
        assert_eq!(map.get(&"a"), Some(2));
        assert!(map.contains(&"a"));
        assert_eq!(map.delete(&"a"), Some(2));
        assert!(map.is_empty());
    }

    #[test]
    fn get_or_insert_with_is_lazy() {
        let map: SyncMap<&str, u32> = SyncMap::new();
        assert_eq!(map.get_or_insert_with("x", || 7), 7);
        assert_eq!(map.get_or_insert_with("x", || unreachable!()), 7);
    }

    #[test]
    fn for_each_can_mutate_map_from_callback() {
        let map = SyncMap::new();
        map.set(1, "one");
        map.set(2, "two");
        let mut keys = Vec::new();
        map.for_each(|k, _| {
            // would deadlock if the read lock were still held
            map.delete(k);
            keys.push(*k);
        });
        assert_eq!(keys, vec![1, 2]);
        assert!(map.is_empty());
    }
}
