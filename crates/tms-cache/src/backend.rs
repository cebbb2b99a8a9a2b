//! Cache backend abstraction

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Cache errors; callers degrade these to a miss
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache backend unavailable")]
    Unavailable,
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

/// Key/value store holding serialized response payloads
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logs and stats
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Delete every key starting with `prefix`; returns how many were removed
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Delete every key owned by this application
    async fn flush(&self) -> Result<u64, CacheError> {
        let mut removed = 0;
        for kind in crate::keys::KINDS {
            removed += self.delete_prefix(&crate::keys::kind_prefix(kind)).await?;
        }
        Ok(removed)
    }

    /// Round-trip check used by readiness probes
    async fn ping(&self) -> Result<(), CacheError> {
        self.get("tms:ping").await.map(|_| ())
    }
}
