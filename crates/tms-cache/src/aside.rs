//! Cache-aside read path and prefix invalidation
//!
//! Reads check the cache first and fall through to the loader on a miss,
//! on a backend error, or on a payload that no longer decodes. Loaded values
//! are written back with the configured TTL; a failed write-back is logged
//! and the read still succeeds.
//!
//! Writers call [`CacheAside::invalidate_kind`] only after the store of
//! record has accepted the mutation. Invalidation failures are logged and
//! never surface as request errors.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::CacheBackend;
use crate::keys;
use crate::stats::CacheStats;

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct CacheAside {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    stats: Arc<CacheStats>,
}

impl CacheAside {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        let stats = Arc::new(CacheStats::new(backend.name()));
        Self {
            backend,
            ttl,
            stats,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Return the cached value for `key`, or load, store and return it
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.backend.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str::<T>(&payload) {
                Ok(value) => {
                    self.stats.record_hit();
                    tracing::debug!(key, "Cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(e) => {
                self.stats.record_error();
                tracing::warn!(key, error = %e, "Cache read failed, falling back to store");
            }
        }

        self.stats.record_miss();
        let value = load().await?;
        self.write_back(key, &value).await;
        Ok(value)
    }

    async fn write_back<T: Serialize>(&self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        match self.backend.set(key, payload, self.ttl).await {
            Ok(()) => self.stats.record_write(),
            Err(e) => {
                self.stats.record_error();
                tracing::warn!(key, error = %e, "Cache write-back failed");
            }
        }
    }

    /// Drop every cached entry of `kind`; returns the number of keys removed
    pub async fn invalidate_kind(&self, kind: &str) -> u64 {
        let prefix = keys::kind_prefix(kind);
        match self.backend.delete_prefix(&prefix).await {
            Ok(removed) => {
                self.stats.record_invalidations(removed);
                tracing::debug!(kind, removed, "Invalidated cache prefix");
                removed
            }
            Err(e) => {
                self.stats.record_error();
                tracing::warn!(kind, error = %e, "Cache invalidation failed");
                0
            }
        }
    }
}
