// Content-addressed condition result cache: LRU with per-entry TTL,
// keyed by (condition key, store version)

use crate::condition::ConditionPayload;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Cache statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
    pub capacity: usize,
}

struct Entry {
    matched: bool,
    payload: Option<ConditionPayload>,
    inserted_at: Instant,
}

/// Condition result cache. A commit bumps the store version, which
/// changes every key; stale versions age out of the LRU naturally.
pub struct ConditionCache {
    entries: LruCache<(String, u64), Entry>,
    ttl: Duration,
    hits: u64,
    misses: u64,
}

impl ConditionCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a cached result for a condition at a store version.
    /// Expired entries are evicted on access.
    pub fn get(
        &mut self,
        condition_key: &str,
        store_version: u64,
    ) -> Option<(bool, Option<ConditionPayload>)> {
        let key = (condition_key.to_string(), store_version);
        if let Some(entry) = self.entries.get(&key) {
            if entry.inserted_at.elapsed() <= self.ttl {
                self.hits += 1;
                return Some((entry.matched, entry.payload.clone()));
            }
            self.entries.pop(&key);
        }
        self.misses += 1;
        None
    }

    pub fn put(
        &mut self,
        condition_key: String,
        store_version: u64,
        matched: bool,
        payload: Option<ConditionPayload>,
    ) {
        self.entries.put(
            (condition_key, store_version),
            Entry {
                matched,
                payload,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
            size: self.entries.len(),
            capacity: self.entries.cap().get(),
        }
    }
}
