//! Inventory Ledger - API Server Binary
//!
//! This binary starts the HTTP API server for the inventory posting engine.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin inventory-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE__URL=postgres://... cargo run --bin inventory-api
//!
//! # Run without a database
//! API_STORAGE=memory cargo run --bin inventory-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_LOG_JSON` - Emit JSON log lines (default: false)
//! * `API_STORAGE` - `postgres` (default) or `memory`
//! * `API_DATABASE__URL` - PostgreSQL connection string
//! * `API_DATABASE__LOCK_TIMEOUT` - Row lock wait in seconds (default: 5)
//! * `API_POSTING__INBOUND_TYPES` / `API_POSTING__OUTBOUND_TYPES` - Comma separated operation types
//! * `API_POSTING__VAT_RATE` - VAT rate for new documents (default: 0.20)
//! * `API_POSTING__MAX_CONFLICT_RETRIES` - Posting retries after a lock conflict (default: 3)
//!
//! Values may also come from `config/inventory.toml`; environment variables win.

use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use domain_inventory::InMemoryLedgerStore;
use infra_db::{create_pool, run_migrations, PostgresLedgerStore};
use interface_api::config::{ApiConfig, StorageBackend};
use interface_api::create_router;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, opens the ledger store,
/// and starts the HTTP server.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be parsed
/// - Database connection or migrations fail
/// - Server fails to bind to the configured address
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config();

    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        storage = ?config.storage,
        "Starting Inventory Ledger API Server"
    );

    let app = build_app(config.clone()).await?;

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads API configuration, falling back to defaults when it cannot be parsed.
fn load_config() -> ApiConfig {
    ApiConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Invalid configuration ({}), using defaults", e);
        ApiConfig::default()
    })
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_target(true)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(true)))
        .init();
}

/// Opens the configured ledger store and builds the router over it.
async fn build_app(config: ApiConfig) -> anyhow::Result<Router> {
    match config.storage {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(config.database.clone())
                .await
                .context("failed to connect to database")?;

            tracing::info!("Running database migrations...");
            run_migrations(&pool).await.context("failed to run migrations")?;
            tracing::info!("Database ready");

            Ok(create_router(PostgresLedgerStore::new(pool), config)?)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory ledger store, data is lost on shutdown");
            Ok(create_router(InMemoryLedgerStore::new(), config)?)
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// This enables graceful shutdown of the server, allowing in-flight
/// requests to complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
