//! Health, readiness and metrics endpoints

use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is alive", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
    })
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: bool,
    /// Name of the cache backend in use
    pub cache: String,
}

/// Readiness probe; the store must answer a ping
///
/// The cache is reported but never blocks readiness, since reads fall
/// back to the store when it is down.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Store unreachable", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.repos.health.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            false
        }
    };

    let response = ReadinessResponse {
        ready: database,
        database,
        cache: state.cache.stats().report().backend,
    };

    if database {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Prometheus text exposition
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "health",
    responses((status = 200, description = "Prometheus metrics", content_type = "text/plain"))
)]
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.cache.stats().report();
    match state.metrics.render(&report) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                String::new(),
            )
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthcheckerResponse {
    pub status: String,
    pub message: String,
}

/// Per-role liveness check, reachable only with a session of that role
#[utoipa::path(
    get,
    path = "/api/v1/{group}/healthchecker",
    tag = "health",
    params(("group" = String, Path, description = "`admin`, `manager` or `staff`")),
    responses(
        (status = 200, description = "Authenticated and authorized", body = HealthcheckerResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Role not allowed"),
    ),
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
pub async fn healthchecker() -> Json<HealthcheckerResponse> {
    Json(HealthcheckerResponse {
        status: "success".to_string(),
        message: "Training Plan API is running".to_string(),
    })
}
