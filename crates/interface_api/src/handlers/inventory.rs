//! Balance and report handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use core_kernel::NomenclatureId;
use domain_inventory::{inventory_on_date, sales_between, InventoryBalance, LedgerStore, DEFAULT_STOCK_ACCOUNT};
use uuid::Uuid;

use crate::dto::inventory::*;
use crate::{error::ApiError, AppState};

/// Lists all balance rows
pub async fn list_balances<S: LedgerStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<InventoryBalance>>, ApiError> {
    Ok(Json(state.service.store().list_balances().await?))
}

/// Gets the balance of one item on one account
pub async fn get_balance<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(item_id): Path<Uuid>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<InventoryBalance>, ApiError> {
    let item = NomenclatureId::from_uuid(item_id);
    let account = query.account.as_deref().unwrap_or(DEFAULT_STOCK_ACCOUNT);

    let balance = state
        .service
        .store()
        .get_balance(item, account)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No balance for {} on account {}", item, account)))?;

    Ok(Json(balance))
}

/// Stock positions rebuilt from posted documents up to a date
pub async fn inventory_report<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<InventoryReportResponse>, ApiError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let positions = inventory_on_date(state.service.store(), state.service.classifier(), date).await?;

    Ok(Json(InventoryReportResponse::new(date, positions)))
}

/// Posted outbound lines between two dates, both inclusive
pub async fn sales_report<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<SalesReportQuery>,
) -> Result<Json<SalesReportResponse>, ApiError> {
    let lines = sales_between(state.service.store(), state.service.classifier(), query.from, query.to).await?;

    Ok(Json(SalesReportResponse::new(query.from, query.to, lines)))
}
