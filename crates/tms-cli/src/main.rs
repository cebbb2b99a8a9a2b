//! TMS CLI - Administration commands
//!
//! Usage:
//!   tms init-db
//!   tms seed-admin [--password <password>]
//!   tms hash-password <password>
//!   tms cache-flush

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tms_api::auth::{hash_password, PasswordConfig};
use tms_api::services::{ensure_admin, SeedOutcome, DEFAULT_SEED_PASSWORD, SEED_ADMIN_EMAIL};
use tms_core::{AppConfig, PgStore, Repositories};

#[derive(Parser)]
#[command(name = "tms")]
#[command(about = "Training management system administration")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables still override it
    #[arg(long, env = "TMS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create tables and indexes if they are missing
    InitDb,
    /// Create the system administrator unless one exists
    SeedAdmin {
        #[arg(long, env = "SEED_ADMIN_PASSWORD", default_value = DEFAULT_SEED_PASSWORD)]
        password: String,
    },
    /// Print the Argon2id hash of a password
    HashPassword { password: String },
    /// Drop every cached listing and record
    CacheFlush,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            AppConfig::from_file(path)?.with_env_override()?
        }
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<PgStore> {
    PgStore::new(&config.database.url, config.database.max_connections)
        .await
        .context("connecting to PostgreSQL")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tms_cli=info,tms_api=info,tms_cache=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
        }
        Commands::InitDb => {
            let config = load_config(cli.config)?;
            connect_store(&config).await?.init_schema().await?;
            println!("Schema is up to date");
        }
        Commands::SeedAdmin { password } => {
            let config = load_config(cli.config)?;
            let store = connect_store(&config).await?;
            store.init_schema().await?;
            let repos = Repositories::from_store(Arc::new(store));

            match ensure_admin(
                &repos.users,
                &repos.departments,
                &password,
                &PasswordConfig::default(),
            )
            .await?
            {
                SeedOutcome::Created { user_id } => {
                    println!("Created administrator {SEED_ADMIN_EMAIL} (id {user_id})")
                }
                SeedOutcome::AlreadyPresent => println!("An administrator already exists"),
            }
        }
        Commands::CacheFlush => {
            let config = load_config(cli.config)?;
            let backend = tms_cache::connect(&config.cache).await?;
            let removed = backend.flush().await?;
            println!("Removed {removed} cache entries from {}", backend.name());
        }
    }

    Ok(())
}
