//! Read-through response cache with prefix invalidation
//!
//! Fronts the store for list/detail queries. Keys are colon-separated
//! (`servers:detail:<id>`, `metrics:server:<id>`), so a write can drop
//! every entry that depends on it with one prefix sweep. Entries expire
//! after a per-resource-class TTL.
//!
//! The cache is best-effort: a miss (or an expired entry) just means the
//! query service recomputes from the store and repopulates.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::observability::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL};

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// TTL-bound key/value cache for serialized API responses.
#[derive(Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key. `class` labels the hit/miss counters per resource
    /// class (`servers`, `metrics`, `server_metrics`).
    pub async fn get(&self, key: &str, class: &str) -> Option<Value> {
        let entries = self.entries.read().await;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                CACHE_HITS_TOTAL.with_label_values(&[class]).inc();
                trace!("cache hit: {key}");
                Some(entry.value.clone())
            }
            _ => {
                CACHE_MISSES_TOTAL.with_label_values(&[class]).inc();
                trace!("cache miss: {key}");
                None
            }
        }
    }

    /// Insert a value and sweep out whatever has expired while the
    /// write lock is held. Writes are the only thing that grows the
    /// map, so tying eviction to them keeps it bounded by the live
    /// working set.
    pub async fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    /// Remove every entry whose key starts with `prefix`, dropping
    /// expired entries along the way. Returns the number of matching
    /// entries removed.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let mut dropped = 0;
        entries.retain(|key, entry| {
            if key.starts_with(prefix) {
                dropped += 1;
                return false;
            }
            entry.expires_at > now
        });

        if dropped > 0 {
            debug!("invalidated {dropped} cache entries under prefix {prefix}");
        }

        dropped
    }

    /// Current entry count. Expired entries linger only until the next
    /// write or prefix sweep evicts them.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
