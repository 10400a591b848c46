//! # Cache Facade
//!
//! Read-through memoization over an injected [`CacheStore`]. Only raw,
//! permission-independent snapshots go through here; anything filtered for
//! a viewer is recomputed per request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use palaver_core::error::{AppError, Result};
use palaver_core::traits::CacheStore;

/// Key for the whole pre-permission place tree snapshot.
pub const PLACES_KEY: &str = "places";

pub fn place_key(id: Uuid) -> String {
    format!("place_{id}")
}

pub fn discussion_key(id: Uuid) -> String {
    format!("discussion_{id}")
}

pub fn user_key(id: Uuid) -> String {
    format!("user_{id}")
}

/// TTL-memoizing handle shared by the engine services.
#[derive(Clone)]
pub struct Memo {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl Memo {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Return the cached value under `key`, or compute, store and return
    /// it. A cached value that no longer decodes is treated as a miss.
    pub async fn remember<T, F, Fut>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.store.get(key).await {
            if let Ok(hit) = serde_json::from_value(value) {
                return Ok(hit);
            }
        }

        let fresh = compute().await?;

        let value = serde_json::to_value(&fresh)
            .map_err(|e| AppError::Internal(format!("cache encode for {key}: {e}")))?;
        self.store.put(key, value, self.ttl).await;

        Ok(fresh)
    }

    /// Drop `key` from the store. Mutations call this after their write
    /// commits so a concurrent reader cannot repopulate pre-write data.
    pub async fn forget(&self, key: &str) {
        tracing::debug!(key, "cache invalidated");
        self.store.forget(key).await;
    }
}
