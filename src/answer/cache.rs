//! In-process answer cache: bounded LRU with a fixed per-entry TTL.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::Serialize;

use super::Answer;
use crate::config::CacheConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

pub struct QueryCache {
    cache: Cache<String, Answer>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, Duration::from_secs(config.ttl_secs))
    }

    /// Look up a normalized key, counting the hit or miss.
    pub fn get(&self, key: &str) -> Option<Answer> {
        let found = self.cache.get(key);
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, key: String, answer: Answer) {
        self.cache.insert(key, answer);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}

/// Trim, lower-case, and collapse internal whitespace.
pub fn normalize_key(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> Answer {
        Answer {
            answer: text.into(),
            source: "resonance".into(),
            confidence: 0.8,
            cached: false,
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  What IS   Resonance?\n"), "what is resonance?");
        assert_eq!(normalize_key("   "), "");
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let cache = QueryCache::new(10, Duration::from_secs(60));
        assert!(cache.get("q").is_none());
        cache.insert("q".into(), answer("a"));
        assert_eq!(cache.get("q").unwrap().answer, "a");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let cache = QueryCache::new(10, Duration::from_millis(50));
        cache.insert("q".into(), answer("a"));
        std::thread::sleep(Duration::from_millis(120));
        assert!(cache.get("q").is_none());
    }
}
