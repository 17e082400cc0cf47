//! HTTP API Layer
//!
//! This crate provides the REST API for the inventory ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: items, documents (create, read, post), balances, the
//!   inventory-on-date report and the sales report
//! - **Middleware**: tracing and request logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! The router is generic over the `LedgerStore`, so the same routes run on
//! PostgreSQL in production and on the in-memory store in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(PostgresLedgerStore::new(pool), config)?;
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use core_kernel::CoreError;
use domain_inventory::{LedgerStore, PostingService};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{documents, health, inventory, items};
use crate::middleware::request_logging;

/// Application state shared across handlers
pub struct AppState<S> {
    pub service: Arc<PostingService<S>>,
    pub config: Arc<ApiConfig>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            config: Arc::clone(&self.config),
        }
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `store` - Ledger store the posting service runs against
/// * `config` - API configuration
///
/// # Errors
///
/// Returns `CoreError::Configuration` when the posting configuration has
/// overlapping inbound and outbound operation types
pub fn create_router<S: LedgerStore>(store: S, config: ApiConfig) -> Result<Router, CoreError> {
    let service = PostingService::new(store, &config.posting)?;
    let state = AppState {
        service: Arc::new(service),
        config: Arc::new(config),
    };

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check::<S>));

    // Item routes
    let item_routes = Router::new()
        .route("/", post(items::upsert_item::<S>))
        .route("/:id", get(items::get_item::<S>));

    // Document routes
    let document_routes = Router::new()
        .route("/", post(documents::create_document::<S>))
        .route("/", get(documents::list_documents::<S>))
        .route("/:id", get(documents::get_document::<S>))
        .route("/:id/post", post(documents::post_document::<S>));

    // Balance and report routes
    let inventory_routes = Router::new()
        .route("/balances", get(inventory::list_balances::<S>))
        .route("/balances/:item_id", get(inventory::get_balance::<S>))
        .route("/report", get(inventory::inventory_report::<S>));

    let report_routes = Router::new().route("/sales", get(inventory::sales_report::<S>));

    let api_routes = Router::new()
        .nest("/items", item_routes)
        .nest("/documents", document_routes)
        .nest("/inventory", inventory_routes)
        .nest("/reports", report_routes)
        .layer(axum_middleware::from_fn(request_logging));

    // Combine all routes
    let router = Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state);

    Ok(router)
}
