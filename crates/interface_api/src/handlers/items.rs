//! Item handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use core_kernel::NomenclatureId;
use domain_inventory::LedgerStore;
use uuid::Uuid;
use validator::Validate;

use crate::dto::items::*;
use crate::{error::ApiError, AppState};

/// Registers an item, or renames it when the id already exists
pub async fn upsert_item<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<UpsertItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    request.validate()?;
    let item = request.into_item();
    state.service.store().upsert_item(&item).await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Gets an item by ID
pub async fn get_item<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemResponse>, ApiError> {
    let id = NomenclatureId::from_uuid(id);
    let item = state
        .service
        .store()
        .get_item(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {} not found", id)))?;

    Ok(Json(item.into()))
}
