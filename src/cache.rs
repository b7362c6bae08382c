/**
 * Shared Caches
 *
 * DESIGN DECISION: Mutex-guarded `HashMap`, not a channel or actor
 * WHY: §5 only requires that a concurrent re-ingestion of the same key
 * returns the first-computed value (single-writer-or-equivalent); a plain
 * mutex around a map satisfies that with the least machinery
 *
 * REASONING CHAIN:
 * 1. `Cache<K, V>` backs the Component Identifier's FileRecord cache —
 *    plain and idempotent, no expiry
 * 2. `TtlCache<K, V>` backs the registry/license caches — entries expire on
 *    read, never via a background task (§5 Cancellation and timeouts)
 * 3. Both types are `Send + Sync` so the `Coordinator`'s bulk-ingestion
 *    helper can share one analyzer instance across a rayon thread pool
 */

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A plain, idempotent, thread-safe cache with no expiry.
pub struct Cache<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().expect("cache lock poisoned").get(key).cloned()
    }

    /// Return the cached value for `key`, computing and storing it on miss.
    /// Guarantees the first computed value wins under concurrent access.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        let mut guard = self.entries.lock().expect("cache lock poisoned");
        if let Some(value) = guard.get(&key) {
            return value.clone();
        }
        let value = compute();
        guard.insert(key, value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe cache with absolute wall-clock TTL. Expired entries are
/// evicted lazily on read, never by a background task.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (V, Instant)>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.entries.lock().expect("cache lock poisoned");
        match guard.get(key) {
            Some((value, inserted_at)) if inserted_at.elapsed() <= self.ttl => Some(value.clone()),
            Some(_) => {
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let mut guard = self.entries.lock().expect("cache lock poisoned");
        guard.insert(key, (value, Instant::now()));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn plain_cache_is_idempotent() {
        let cache: Cache<String, u32> = Cache::new();
        let mut calls = 0;
        let first = cache.get_or_insert_with("a".to_string(), || {
            calls += 1;
            42
        });
        let second = cache.get_or_insert_with("a".to_string(), || {
            calls += 1;
            99
        });
        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn concurrent_insert_returns_first_computed_value() {
        let cache: std::sync::Arc<Cache<String, u32>> = std::sync::Arc::new(Cache::new());
        let mut handles = vec![];
        for i in 0..8 {
            let cache = cache.clone();
            handles.push(thread::spawn(move || {
                cache.get_or_insert_with("shared".to_string(), || i)
            }));
        }
        let results: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let first = results[0];
        assert!(results.iter().all(|&r| r == first));
    }

    #[test]
    fn ttl_cache_expires_entries_on_read() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(1));
        cache.insert("k".to_string(), 7);
        thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"k".to_string()), None);
    }

    #[test]
    fn ttl_cache_hit_matches_most_recent_store() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("k".to_string(), 1);
        cache.insert("k".to_string(), 2);
        assert_eq!(cache.get(&"k".to_string()), Some(2));
    }
}
