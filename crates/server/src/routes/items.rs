use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pantry_core::{quantity_text, today, InventoryItem, ItemForm, ItemId, Quantity};
use pantry_storage::{InventoryStore, StorageError};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::{AppState, Backends};

#[derive(Debug, Deserialize)]
pub struct QuantityEdit {
    pub id: ItemId,
    #[serde(deserialize_with = "quantity_text")]
    pub quantity: String,
}

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    #[serde(deserialize_with = "quantity_text")]
    pub quantity: String,
}

#[derive(Debug, Default, Serialize)]
pub struct QuantityEditReport {
    pub updated: usize,
    pub unchanged: usize,
    pub unknown: Vec<ItemId>,
}

#[derive(Debug, Serialize)]
pub struct ClearReport {
    pub removed: u64,
}

fn parse_quantity(id: &ItemId, raw: &str) -> Result<Quantity, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Quantity for item {id} must not be empty")))
}

pub async fn list_items<B: Backends>(
    State(state): State<AppState<B>>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

pub async fn form_defaults() -> Json<ItemForm> {
    Json(ItemForm::with_defaults(today()))
}

pub async fn add_item<B: Backends>(
    State(state): State<AppState<B>>,
    ApiJson(form): ApiJson<ItemForm>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let new_item = form.validate()?;
    let item = state.store.create(new_item).await?;
    tracing::info!(id = %item.id, name = %item.name, "Item added");
    Ok((StatusCode::CREATED, Json(item)))
}

/// Save edited quantities from the inventory table. Only rows whose
/// quantity actually changed are written.
pub async fn save_quantities<B: Backends>(
    State(state): State<AppState<B>>,
    ApiJson(edits): ApiJson<Vec<QuantityEdit>>,
) -> Result<Json<QuantityEditReport>, ApiError> {
    let parsed = edits
        .iter()
        .map(|e| parse_quantity(&e.id, &e.quantity).map(|q| (&e.id, q)))
        .collect::<Result<Vec<_>, _>>()?;

    let current: HashMap<ItemId, Quantity> = state
        .store
        .list()
        .await?
        .into_iter()
        .map(|item| (item.id, item.quantity))
        .collect();

    let mut report = QuantityEditReport::default();
    for (id, quantity) in parsed {
        match current.get(id) {
            None => report.unknown.push(id.clone()),
            Some(existing) if *existing == quantity => report.unchanged += 1,
            Some(_) => match state.store.update_quantity(id, &quantity).await {
                Ok(()) => report.updated += 1,
                // Removed by someone else since the list was read.
                Err(StorageError::NotFound(_)) => report.unknown.push(id.clone()),
                Err(e) => return Err(e.into()),
            },
        }
    }

    tracing::info!(
        updated = report.updated,
        unchanged = report.unchanged,
        unknown = report.unknown.len(),
        "Saved quantity edits"
    );
    Ok(Json(report))
}

pub async fn update_quantity<B: Backends>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<QuantityBody>,
) -> Result<StatusCode, ApiError> {
    let id = ItemId::new(id);
    let quantity = parse_quantity(&id, &body.quantity)?;
    state.store.update_quantity(&id, &quantity).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_item<B: Backends>(
    State(state): State<AppState<B>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = ItemId::new(id);
    if state.store.delete(&id).await? {
        tracing::info!(%id, "Item deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Item {id} not found")))
    }
}

pub async fn clear_items<B: Backends>(
    State(state): State<AppState<B>>,
) -> Result<Json<ClearReport>, ApiError> {
    let removed = state.store.clear_all().await?;
    tracing::info!(removed, "Inventory cleared");
    Ok(Json(ClearReport { removed }))
}
