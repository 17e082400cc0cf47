//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use domain_inventory::LedgerStore;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check (includes the ledger store)
pub async fn readiness_check<S: LedgerStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<HealthResponse>, StatusCode> {
    state.service.store().ping().await.map_err(|e| {
        warn!(error = %e, "Ledger store not ready");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok(Json(HealthResponse {
        status: "ready".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
