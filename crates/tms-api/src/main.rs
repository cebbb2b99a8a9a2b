//! TMS API Server
//!
//! REST API server for the training management system.

use std::sync::Arc;
use tms_api::{
    auth::PasswordConfig,
    create_router,
    services::{ensure_admin, SeedOutcome, DEFAULT_SEED_PASSWORD},
    state::AppState,
};
use tms_core::{AppConfig, LocalStorage, LoggingConfig, PgStore, Repositories};

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("tms_api={},tower_http=debug", logging.level).into());

    if logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);
    config.auth.validate()?;

    // Storage backends
    let store = PgStore::new(&config.database.url, config.database.max_connections).await?;
    store.init_schema().await?;
    let repos = Repositories::from_store(Arc::new(store));

    let cache = tms_cache::cache_aside(&config.cache).await?;
    tracing::info!(
        backend = %cache.stats().report().backend,
        ttl_secs = cache.ttl().as_secs(),
        "Response cache ready"
    );
    let storage = Arc::new(LocalStorage::new(config.storage.upload_path.clone()));

    if std::env::var("SEED_ADMIN").is_ok_and(|v| v == "true") {
        let password = std::env::var("SEED_ADMIN_PASSWORD")
            .unwrap_or_else(|_| DEFAULT_SEED_PASSWORD.to_string());
        match ensure_admin(
            &repos.users,
            &repos.departments,
            &password,
            &PasswordConfig::default(),
        )
        .await?
        {
            SeedOutcome::Created { user_id } => {
                tracing::info!(user_id, "Seeded administrator account")
            }
            SeedOutcome::AlreadyPresent => {}
        }
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(
        config,
        repos,
        cache,
        storage,
        PasswordConfig::default(),
    )?);

    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("TMS API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
