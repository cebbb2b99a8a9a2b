//! Cache statistics

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for cache performance monitoring
#[derive(Debug)]
pub struct CacheStats {
    /// Backend name for identification
    name: String,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    /// Reads or writes the backend rejected
    errors: AtomicU64,
    /// Keys removed by prefix invalidation
    invalidations: AtomicU64,
}

impl CacheStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalidations(&self, count: u64) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Total lookups (hits + misses)
    pub fn total_requests(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    pub fn report(&self) -> CacheStatsReport {
        CacheStatsReport {
            backend: self.name.clone(),
            hits: self.hits(),
            misses: self.misses(),
            writes: self.writes(),
            errors: self.errors(),
            invalidations: self.invalidations(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Serializable snapshot of [`CacheStats`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub backend: String,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub errors: u64,
    pub invalidations: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats::new("memory");
        assert_eq!(stats.hit_rate(), 0.0);

        stats.record_miss();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.total_requests(), 3);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_report() {
        let stats = CacheStats::new("redis");
        stats.record_write();
        stats.record_error();
        stats.record_invalidations(4);

        let report = stats.report();
        assert_eq!(report.backend, "redis");
        assert_eq!(report.writes, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(report.invalidations, 4);
    }
}
