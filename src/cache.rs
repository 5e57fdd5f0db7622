//! In-process TTL cache for read-mostly responses
//!
//! Project detail lookups by short key are served from here until the entry
//! expires or any catalog write invalidates the whole cache. The health
//! aggregator probes it with a set/get/delete round trip.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    /// Bumped on every invalidation so fills computed before a write are dropped
    generation: AtomicU64,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            generation: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let hit = self.entries.get(key).and_then(|entry| {
            if entry.expires_at > now {
                Some(entry.value.clone())
            } else {
                None
            }
        });
        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        hit
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.set_with_ttl(key, value, self.ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Store `value` only if no invalidation happened since `generation` was
    /// read. Returns whether the value was stored.
    pub fn set_if_current(&self, generation: u64, key: impl Into<String>, value: Value) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.set(key, value);
        // An invalidation may have raced the insert
        if self.generation() != generation {
            self.entries.clear();
            return false;
        }
        true
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_delete() {
        let cache = ResponseCache::default();
        cache.set("project:eco", json!({"id": 1}));
        assert_eq!(cache.get("project:eco"), Some(json!({"id": 1})));
        assert!(cache.delete("project:eco"));
        assert!(!cache.delete("project:eco"));
        assert_eq!(cache.get("project:eco"), None);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = ResponseCache::default();
        cache.set_with_ttl("k", json!(1), Duration::ZERO);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stale_fill_after_invalidation_is_rejected() {
        let cache = ResponseCache::default();
        let generation = cache.generation();
        cache.invalidate_all();
        assert!(!cache.set_if_current(generation, "k", json!("stale")));
        assert_eq!(cache.get("k"), None);

        let generation = cache.generation();
        assert!(cache.set_if_current(generation, "k", json!("fresh")));
        assert_eq!(cache.get("k"), Some(json!("fresh")));
    }
}
