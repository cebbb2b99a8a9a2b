//! TMS Cache - response cache for listing and detail reads
//!
//! Provides:
//! - A [`CacheBackend`] trait with Redis and in-process (moka) variants
//! - The key scheme shared by every cacheable resource kind
//! - [`CacheAside`], the read-through / invalidate-on-write helper
//! - Hit, miss and invalidation statistics

pub mod aside;
pub mod backend;
pub mod keys;
pub mod memory;
pub mod redis_backend;
pub mod stats;

pub use aside::{CacheAside, DEFAULT_TTL};
pub use backend::{CacheBackend, CacheError};
pub use memory::MemoryCache;
pub use redis_backend::RedisCache;
pub use stats::{CacheStats, CacheStatsReport};

use std::sync::Arc;
use std::time::Duration;
use tms_core::CacheConfig;

/// Build the backend selected by configuration
pub async fn connect(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>, CacheError> {
    match config.redis_url.as_deref() {
        Some(url) => Ok(Arc::new(RedisCache::connect(url).await?)),
        None => {
            tracing::info!("REDIS_URL not set, using in-process cache");
            Ok(Arc::new(MemoryCache::new(config.max_entries)))
        }
    }
}

/// Build the cache-aside helper for `config`
pub async fn cache_aside(config: &CacheConfig) -> Result<CacheAside, CacheError> {
    let backend = connect(config).await?;
    Ok(CacheAside::new(backend, Duration::from_secs(config.ttl_secs)))
}
