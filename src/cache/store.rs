//! In-process cache backend.
//!
//! LRU-bounded map of JSON payloads with a per-entry expiry instant. Expired entries read as
//! misses and are dropped on access; capacity evictions are counted.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use serde_json::Value;
use tokio::time::Instant;

use super::backend::{CacheBackend, CacheError};
use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";
pub(crate) const METRIC_EVICT: &str = "gamedex_cache_evict_total";

#[derive(Clone)]
struct StoredEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// LRU-bounded in-process cache backend.
pub struct MemoryBackend {
    entries: RwLock<LruCache<String, StoredEntry>>,
}

impl MemoryBackend {
    /// Create a new backend sized from the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.max_entries_non_zero())),
        }
    }

    /// Get the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    /// Check if the backend is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }
        entries.pop(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        let evicted = rw_write(&self.entries, SOURCE, "set")
            .push(key.to_string(), StoredEntry { value, expires_at });
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            metrics::counter!(METRIC_EVICT).increment(1);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(rw_write(&self.entries, SOURCE, "delete").pop(key).is_some())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "clear").clear();
        Ok(())
    }
}
