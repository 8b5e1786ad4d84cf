use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use sea_orm::EntityName;

use super::{created, data, ApiJson, ApiQuery, Deleted};
use crate::cache::{CacheKey, WritePath};
use crate::dates::today;
use crate::entities::{assigned_asset, inventory};
use crate::error::AppResult;
use crate::notifications::ChangeEvent;
use crate::query::{self, ListParams, Searchable};
use crate::storage::assignment_store::{self, AssignmentPatch, NewAssignment};
use crate::storage::{delete_ids, DeleteRequest};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/assigned-assets",
        get(list_assignments)
            .post(create_assignment)
            .put(update_assignment)
            .delete(delete_assignments),
    )
}

impl Searchable for assigned_asset::Model {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.assigned_number.as_str()),
            Some(self.asset_tag.as_str()),
            Some(self.assigned_to.as_str()),
            self.department.as_deref(),
            self.position.as_deref(),
            self.remarks.as_deref(),
        ]
    }
}

fn table() -> String {
    assigned_asset::Entity.table_name().to_string()
}

async fn list_assignments(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<impl IntoResponse> {
    let rows = state
        .cache
        .get_or_load(CacheKey::AssignedAssets, || assignment_store::list(&state.db))
        .await?;
    Ok(data(query::list(rows, &params)))
}

async fn create_assignment(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewAssignment>,
) -> AppResult<impl IntoResponse> {
    let assignment = assignment_store::create(&state.db, input, today()).await?;

    let inventory_table = inventory::Entity.table_name().to_string();
    let events = assignment
        .rows
        .iter()
        .map(|row| ChangeEvent::insert(&table(), row))
        .chain(
            assignment
                .items
                .iter()
                .map(|item| ChangeEvent::update(&inventory_table, item)),
        )
        .collect::<Vec<_>>();
    state.after_write(WritePath::AssignedAsset, events).await;

    Ok(created(assignment))
}

async fn update_assignment(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<AssignmentPatch>,
) -> AppResult<impl IntoResponse> {
    let row = assignment_store::update(&state.db, patch).await?;
    state
        .after_write(WritePath::AssignedAsset, [ChangeEvent::update(&table(), &row)])
        .await;
    Ok(data(row))
}

async fn delete_assignments(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteRequest>,
) -> AppResult<impl IntoResponse> {
    let ids = request.into_ids()?;
    let deleted =
        delete_ids::<assigned_asset::Entity, _>(&state.db, assigned_asset::Column::Id, &ids).await?;
    state
        .after_write(
            WritePath::AssignedAsset,
            ids.iter().map(|id| ChangeEvent::delete(&table(), *id)),
        )
        .await;
    Ok(data(Deleted { deleted, ids }))
}
