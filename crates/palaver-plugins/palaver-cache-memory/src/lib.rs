//! # palaver-cache-memory
//!
//! In-process implementation of `CacheStore` on a concurrent map with
//! per-entry TTL. Expired entries are evicted lazily on read; there is no
//! background sweeper.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use palaver_core::traits::CacheStore;
use serde_json::Value;

struct Entry {
    value: Value,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, Entry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<Value> {
        // The shard guard must drop before the remove below, or the two
        // would deadlock on the same shard.
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }

        None
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn forget(&self, key: &str) {
        self.entries.remove(key);
    }
}
