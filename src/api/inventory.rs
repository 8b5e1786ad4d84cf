use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Datelike, NaiveDate};
use sea_orm::EntityName;
use serde::{Deserialize, Serialize};

use super::{created, data, ApiJson, ApiQuery, Deleted};
use crate::cache::{CacheKey, WritePath};
use crate::dates::{asset_age, today, warranty_status, WarrantyStatus};
use crate::entities::inventory::{self, AssetStatus, AssetType};
use crate::error::{AppError, AppResult};
use crate::notifications::ChangeEvent;
use crate::query::{self, ListParams, Searchable};
use crate::storage::inventory_store::{self, InventoryPatch, NewInventoryItem};
use crate::storage::{delete_ids, DeleteRequest};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/inventory",
            get(list_items)
                .post(create_item)
                .put(update_item)
                .delete(delete_items),
        )
        .route("/inventory/asset-tag", get(asset_tag))
        .route("/inventory/warranty", get(warranty))
        .route("/inventory/disposal", get(disposal))
}

/// An inventory row as served: age and warranty status are computed at
/// read time.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryView {
    #[serde(flatten)]
    pub item: inventory::Model,
    pub asset_age: Option<String>,
    pub warranty_status: WarrantyStatus,
}

impl InventoryView {
    pub fn new(item: inventory::Model, today: NaiveDate) -> Self {
        Self {
            asset_age: item.purchase_date.map(|p| asset_age(p, today).to_string()),
            warranty_status: warranty_status(item.warranty_date, today),
            item,
        }
    }
}

impl Searchable for InventoryView {
    fn search_fields(&self) -> Vec<Option<&str>> {
        let item = &self.item;
        vec![
            Some(item.asset_tag.as_str()),
            Some(item.asset_type.as_str()),
            item.brand.as_deref(),
            item.model_name.as_deref(),
            item.serial_number.as_deref(),
            item.new_user.as_deref(),
            item.old_user.as_deref(),
            item.department.as_deref(),
            item.position.as_deref(),
            item.remarks.as_deref(),
        ]
    }
}

#[derive(Debug, Default, Deserialize)]
struct InventoryFilter {
    status: Option<AssetStatus>,
    asset_type: Option<AssetType>,
}

#[derive(Debug, Default, Deserialize)]
struct WarrantyFilter {
    warranty_status: Option<WarrantyStatus>,
}

#[derive(Debug, Deserialize)]
struct AssetTagQuery {
    asset_type: Option<String>,
}

async fn views(state: &AppState) -> AppResult<Vec<InventoryView>> {
    let items = state
        .cache
        .get_or_load(CacheKey::Inventory, || inventory_store::list(&state.db))
        .await?;
    let today = today();
    Ok(items
        .into_iter()
        .map(|item| InventoryView::new(item, today))
        .collect())
}

fn table() -> String {
    inventory::Entity.table_name().to_string()
}

async fn list_items(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
    ApiQuery(filter): ApiQuery<InventoryFilter>,
) -> AppResult<impl IntoResponse> {
    let rows: Vec<_> = views(&state)
        .await?
        .into_iter()
        .filter(|v| filter.status.map_or(true, |s| v.item.status == s))
        .filter(|v| filter.asset_type.map_or(true, |t| v.item.asset_type == t))
        .collect();
    Ok(data(query::list(rows, &params)))
}

async fn warranty(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
    ApiQuery(filter): ApiQuery<WarrantyFilter>,
) -> AppResult<impl IntoResponse> {
    let rows: Vec<_> = views(&state)
        .await?
        .into_iter()
        .filter(|v| v.item.status != AssetStatus::Dispose)
        .filter(|v| filter.warranty_status.map_or(true, |w| v.warranty_status == w))
        .collect();
    Ok(data(query::list(rows, &params)))
}

async fn disposal(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<impl IntoResponse> {
    let rows: Vec<_> = views(&state)
        .await?
        .into_iter()
        .filter(|v| v.item.status == AssetStatus::Dispose)
        .collect();
    Ok(data(query::list(rows, &params)))
}

/// Previews the next tag; `{"asset_tag": "LAP-2026-004"}`.
async fn asset_tag(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AssetTagQuery>,
) -> AppResult<impl IntoResponse> {
    let raw = query
        .asset_type
        .ok_or_else(|| AppError::validation("asset_type is required"))?;
    let asset_type: AssetType = raw.parse().map_err(AppError::Validation)?;
    let tag = inventory_store::next_asset_tag(&state.db, asset_type, today().year()).await?;
    Ok(Json(serde_json::json!({ "asset_tag": tag })))
}

async fn create_item(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewInventoryItem>,
) -> AppResult<impl IntoResponse> {
    let today = today();
    let item = inventory_store::create(&state.db, input, today).await?;
    state
        .after_write(WritePath::Inventory, [ChangeEvent::insert(&table(), &item)])
        .await;
    Ok(created(InventoryView::new(item, today)))
}

async fn update_item(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<InventoryPatch>,
) -> AppResult<impl IntoResponse> {
    let item = inventory_store::update(&state.db, patch).await?;
    state
        .after_write(WritePath::Inventory, [ChangeEvent::update(&table(), &item)])
        .await;
    Ok(data(InventoryView::new(item, today())))
}

async fn delete_items(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteRequest>,
) -> AppResult<impl IntoResponse> {
    let ids = request.into_ids()?;
    let deleted = delete_ids::<inventory::Entity, _>(&state.db, inventory::Column::Id, &ids).await?;
    state
        .after_write(
            WritePath::Inventory,
            ids.iter().map(|id| ChangeEvent::delete(&table(), *id)),
        )
        .await;
    Ok(data(Deleted { deleted, ids }))
}
