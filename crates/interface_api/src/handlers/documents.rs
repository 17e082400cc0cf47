//! Document handlers

use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use core_kernel::{DocumentId, Rate};
use domain_inventory::{Document, LedgerStore, PostingReceipt};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::documents::*;
use crate::{error::ApiError, AppState};

/// Stores a new unposted document
///
/// Line amounts are derived from the VAT-inclusive prices at the configured
/// VAT rate. Creating a document never touches balances.
pub async fn create_document<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    request.validate()?;

    let store = state.service.store();
    let mut missing = Vec::new();
    for item in request.item_ids().into_iter().collect::<BTreeSet<_>>() {
        if store.get_item(item).await?.is_none() {
            missing.push(format!("unknown item: {}", item));
        }
    }
    if !missing.is_empty() {
        return Err(ApiError::Validation {
            message: "Document references unknown items".to_string(),
            details: Some(missing),
        });
    }

    let document = request
        .into_new_document()
        .build(Rate::new(state.config.posting.vat_rate))?;
    store.insert_document(&document).await?;
    info!(document_id = %document.id, operation = %document.operation_type, "Document created");

    let stored = store
        .get_document(document.id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Document {} vanished after insert", document.id)))?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Lists documents in posting order
pub async fn list_documents<S: LedgerStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.service.store().list_documents().await?))
}

/// Gets a document with its lines
pub async fn get_document<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError> {
    let id = DocumentId::from_uuid(id);
    let document = state
        .service
        .store()
        .get_document(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Document {} not found", id)))?;

    Ok(Json(document))
}

/// Posts a document to the inventory ledger
pub async fn post_document<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostingReceipt>, ApiError> {
    let receipt = state.service.post_document(DocumentId::from_uuid(id)).await?;
    Ok(Json(receipt))
}
