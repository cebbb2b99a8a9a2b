//! TMS API - REST server for the training management system
//!
//! Role-scoped authentication with rotating refresh tokens, plus cached
//! CRUD over departments, courses and training plans.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;
use tms_core::ServerConfig;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TMS API",
        version = "0.1.0",
        description = "Training management: sessions, departments, courses, training plans and certificates"
    ),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::health::prometheus_metrics,
        handlers::health::healthchecker,
        handlers::auth::admin_login_handler,
        handlers::auth::manager_login_handler,
        handlers::auth::staff_login_handler,
        handlers::auth::manager_register_handler,
        handlers::auth::staff_register_handler,
        handlers::auth::refresh_handler,
        handlers::auth::logout_handler,
        handlers::auth::me_handler,
        handlers::departments::create_department,
        handlers::departments::list_departments,
        handlers::departments::get_department,
        handlers::departments::update_department,
        handlers::departments::delete_department,
        handlers::programs::create_program,
        handlers::programs::list_programs,
        handlers::programs::get_program,
        handlers::programs::update_program,
        handlers::programs::delete_program,
        handlers::users::admin_create_user,
        handlers::users::admin_list_users,
        handlers::users::admin_get_user,
        handlers::users::admin_update_user,
        handlers::users::admin_delete_user,
        handlers::users::manager_create_user,
        handlers::users::manager_list_users,
        handlers::certificates::upload_certificate,
        handlers::certificates::list_own_certificates,
        handlers::certificates::delete_own_certificate,
        handlers::certificates::list_pending_certificates,
        handlers::certificates::approve_certificate,
        handlers::certificates::reject_certificate,
    ),
    components(schemas(
        error::ApiError,
        handlers::MessageResponse,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::health::HealthcheckerResponse,
        handlers::auth::LoginRequest,
        handlers::auth::LoginResponse,
        handlers::auth::RefreshResponse,
        handlers::auth::RegisterRequest,
        handlers::auth::RegisterResponse,
        handlers::departments::DepartmentRequest,
        handlers::programs::ProgramRequest,
        handlers::programs::ProgramPatchRequest,
        handlers::users::CreateUserRequest,
        handlers::users::UpdateUserRequest,
        handlers::certificates::CertificateUploadForm,
        tms_core::Role,
        tms_core::UserStatus,
        tms_core::CreatedBy,
        tms_core::DepartmentSummary,
        tms_core::UserProfile,
        tms_core::Department,
        tms_core::ProgramType,
        tms_core::Program,
        tms_core::CertificateStatus,
        tms_core::Certificate,
        tms_core::PaginationMeta,
        tms_core::DepartmentPage,
        tms_core::ProgramPage,
        tms_core::CertificatePage,
        tms_core::UserPage,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness, readiness and metrics"),
        (name = "auth", description = "Login, registration and session lifecycle"),
        (name = "departments", description = "Department administration"),
        (name = "programs", description = "Courses and training plans"),
        (name = "users", description = "User provisioning"),
        (name = "certificates", description = "Training certificates"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("access_token"))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Session cookies need credentialed CORS, which rules out a wildcard origin
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: no origins configured, allowing any origin without credentials");
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(origins).allow_credentials(true)
}

/// Assemble the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state
        .config
        .server
        .max_body_size
        .max(state.config.storage.max_upload_bytes);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::prometheus_metrics))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::security_headers_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&state.config.server))
        .with_state(state)
}

/// In-process application for integration tests
///
/// Backed by [`tms_core::MemoryStore`] and [`tms_cache::MemoryCache`], with
/// certificate files written to a temporary directory that lives as long
/// as the app.
#[cfg(feature = "test-utils")]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<tms_core::MemoryStore>,
    pub cache: tms_cache::MemoryCache,
    _upload_dir: tempfile::TempDir,
}

#[cfg(feature = "test-utils")]
pub fn create_test_app() -> TestApp {
    use tms_cache::{CacheAside, MemoryCache};
    use tms_core::{AppConfig, LocalStorage, MemoryStore, Repositories};

    let upload_dir = tempfile::tempdir().expect("create upload dir");

    let mut config = AppConfig::default();
    config.storage.upload_path = upload_dir.path().to_path_buf();

    let store = Arc::new(MemoryStore::new());
    let cache = MemoryCache::default();
    let cache_aside = CacheAside::new(
        Arc::new(cache.clone()),
        Duration::from_secs(config.cache.ttl_secs),
    );
    let storage = Arc::new(LocalStorage::new(upload_dir.path()));

    let state = Arc::new(
        AppState::new(
            config,
            Repositories::from_store(store.clone()),
            cache_aside,
            storage,
            auth::PasswordConfig::fast(),
        )
        .expect("build test state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        cache,
        _upload_dir: upload_dir,
    }
}

/// Router over a fresh in-memory backend
#[cfg(feature = "test-utils")]
pub fn create_router_for_testing() -> Router {
    create_test_app().router
}
