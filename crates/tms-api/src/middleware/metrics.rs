//! Prometheus request metrics
//!
//! Each [`AppState`] owns its registry, so several routers (as in the test
//! suite) can coexist in one process.

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;
use tms_cache::CacheStatsReport;

/// Request latency buckets (seconds), 1ms to 5s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0,
];

#[derive(Clone)]
pub struct HttpMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    cache_hits: IntGauge,
    cache_misses: IntGauge,
    cache_errors: IntGauge,
    cache_invalidations: IntGauge,
}

impl HttpMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("tms".to_string()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(HTTP_LATENCY_BUCKETS.to_vec()),
            &["method", "path"],
        )?;
        let cache_hits = IntGauge::new("cache_hits", "Cache reads served from the cache")?;
        let cache_misses = IntGauge::new("cache_misses", "Cache reads that fell through to the store")?;
        let cache_errors = IntGauge::new("cache_errors", "Cache backend failures")?;
        let cache_invalidations =
            IntGauge::new("cache_invalidations", "Cache keys removed by prefix invalidation")?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(cache_errors.clone()))?;
        registry.register(Box::new(cache_invalidations.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            cache_hits,
            cache_misses,
            cache_errors,
            cache_invalidations,
        })
    }

    pub fn observe(&self, method: &str, path: &str, status: u16, elapsed_secs: f64) {
        self.requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method, path])
            .observe(elapsed_secs);
    }

    /// Prometheus text exposition, with the cache counters folded in
    pub fn render(&self, cache: &CacheStatsReport) -> Result<String, prometheus::Error> {
        self.cache_hits.set(cache.hits as i64);
        self.cache_misses.set(cache.misses as i64);
        self.cache_errors.set(cache.errors as i64);
        self.cache_invalidations.set(cache.invalidations as i64);

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Count and time every request by method, normalized path and status
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = normalize_endpoint(request.uri().path());

    let response = next.run(request).await;

    state.metrics.observe(
        &method,
        &endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// Replace numeric id segments so label cardinality stays bounded
fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|seg| if is_numeric(seg) { ":id" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("/api/v1/admin/departments/123"),
            "/api/v1/admin/departments/:id"
        );
        assert_eq!(
            normalize_endpoint("/api/v1/admin/certificates/7/approve"),
            "/api/v1/admin/certificates/:id/approve"
        );
        assert_eq!(normalize_endpoint("/health"), "/health");
    }

    #[test]
    fn test_render_includes_requests_and_cache() {
        let metrics = HttpMetrics::new().unwrap();
        metrics.observe("GET", "/health", 200, 0.002);

        let report = CacheStatsReport {
            backend: "memory".to_string(),
            hits: 3,
            misses: 1,
            writes: 1,
            errors: 0,
            invalidations: 2,
            hit_rate: 0.75,
        };
        let text = metrics.render(&report).unwrap();

        assert!(text.contains("tms_http_requests_total"));
        assert!(text.contains("path=\"/health\""));
        assert!(text.contains("tms_cache_hits 3"));
    }

    #[test]
    fn test_registries_are_independent() {
        assert!(HttpMetrics::new().is_ok());
        assert!(HttpMetrics::new().is_ok());
    }
}
