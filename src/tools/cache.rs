//! Query-result cache keyed by normalized KQL fingerprint, with a TTL.

use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroUsize;

const MAX_ENTRIES: usize = 256;

struct CacheEntry {
    value: Value,
    inserted_at: Instant,
}

pub struct QueryCache {
    entries: LruCache<String, CacheEntry>,
    ttl: Duration,
    hits: u64,
    misses: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub max_size: usize,
    pub hit_rate: f64,
}

/// Normalize a KQL string into the fingerprint used as the cache key:
/// collapse consecutive whitespace and trim.
pub fn fingerprint(kql: &str) -> String {
    kql.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl QueryCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(MAX_ENTRIES).unwrap()),
            ttl: Duration::from_secs(ttl_seconds),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns a clone of the cached value with `cached:true` set, if a
    /// live (non-expired) entry exists for `kql`.
    pub fn get(&mut self, kql: &str) -> Option<Value> {
        let key = fingerprint(kql);
        let expired = matches!(
            self.entries.peek(&key),
            Some(entry) if entry.inserted_at.elapsed() > self.ttl
        );
        if expired {
            self.entries.pop(&key);
        }
        match self.entries.get(&key) {
            Some(entry) => {
                self.hits += 1;
                let mut value = entry.value.clone();
                if let Value::Object(ref mut map) = value {
                    map.insert("cached".to_string(), Value::Bool(true));
                }
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn set(&mut self, kql: &str, value: Value) {
        let key = fingerprint(kql);
        self.entries.put(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evict only expired entries, returning the number evicted.
    pub fn cleanup(&mut self) -> usize {
        let ttl = self.ttl;
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() > ttl)
            .map(|(k, _)| k.clone())
            .collect();
        let count = expired_keys.len();
        for key in expired_keys {
            self.entries.pop(&key);
        }
        count
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.entries.len(),
            max_size: MAX_ENTRIES,
            hit_rate: if total == 0 {
                0.0
            } else {
                self.hits as f64 / total as f64
            },
        }
    }
}
