use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use sea_orm::EntityName;
use serde::Deserialize;

use super::{created, data, ApiJson, ApiQuery, Deleted};
use crate::cache::{CacheKey, WritePath};
use crate::entities::{activity, history};
use crate::error::AppResult;
use crate::notifications::ChangeEvent;
use crate::query::{self, ListParams, Searchable};
use crate::storage::history_store::{self, HistoryPatch, NewHistory};
use crate::storage::{delete_ids, DeleteRequest};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/histories",
        get(list_histories)
            .post(create_history)
            .put(update_history)
            .delete(delete_histories),
    )
}

impl Searchable for history::Model {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![Some(self.status.as_str()), self.notes.as_deref()]
    }
}

#[derive(Debug, Default, Deserialize)]
struct HistoryFilter {
    account_id: Option<i32>,
}

fn table() -> String {
    history::Entity.table_name().to_string()
}

async fn list_histories(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
    ApiQuery(filter): ApiQuery<HistoryFilter>,
) -> AppResult<impl IntoResponse> {
    let rows: Vec<history::Model> = state
        .cache
        .get_or_load(CacheKey::Histories, || history_store::list(&state.db))
        .await?
        .into_iter()
        .filter(|h: &history::Model| filter.account_id.map_or(true, |id| h.account_id == id))
        .collect();
    Ok(data(query::list(rows, &params)))
}

async fn create_history(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewHistory>,
) -> AppResult<impl IntoResponse> {
    let (entry, touched) = history_store::create(&state.db, input).await?;

    let mut events = vec![ChangeEvent::insert(&table(), &entry)];
    if let Some(activity) = &touched {
        events.push(ChangeEvent::update(activity::Entity.table_name(), activity));
    }
    state.after_write(WritePath::History, events).await;

    Ok(created(entry))
}

async fn update_history(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<HistoryPatch>,
) -> AppResult<impl IntoResponse> {
    let entry = history_store::update(&state.db, patch).await?;
    state
        .after_write(WritePath::History, [ChangeEvent::update(&table(), &entry)])
        .await;
    Ok(data(entry))
}

async fn delete_histories(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteRequest>,
) -> AppResult<impl IntoResponse> {
    let ids = request.into_ids()?;
    let deleted = delete_ids::<history::Entity, _>(&state.db, history::Column::Id, &ids).await?;
    state
        .after_write(
            WritePath::History,
            ids.iter().map(|id| ChangeEvent::delete(&table(), *id)),
        )
        .await;
    Ok(data(Deleted { deleted, ids }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    async fn post(app: &axum::Router, uri: &str, body: Value) -> Value {
        let (status, body) = send(app, Method::POST, uri, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    #[tokio::test]
    async fn test_history_closes_activity() {
        let (app, _) = app().await;
        let account = post(&app, "/api/accounts", json!({ "company_name": "Acme" })).await;
        let activity = post(
            &app,
            "/api/activities",
            json!({ "account_id": account["id"], "subject": "Deliver monitors" }),
        )
        .await;

        // cached before the history write; must not be served stale afterwards
        let (_, body) = send(&app, Method::GET, "/api/activities?completed=false", None).await;
        assert_eq!(body["data"]["total"], 1);

        post(
            &app,
            "/api/histories",
            json!({ "account_id": account["id"], "activity_id": activity["id"], "status": "Delivered" }),
        )
        .await;

        let (_, body) = send(&app, Method::GET, "/api/activities?completed=true", None).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["status"], "Delivered");
    }

    #[tokio::test]
    async fn test_filter_by_account() {
        let (app, _) = app().await;
        let a = post(&app, "/api/accounts", json!({ "company_name": "Acme" })).await;
        let b = post(&app, "/api/accounts", json!({ "company_name": "Globex" })).await;
        post(&app, "/api/histories", json!({ "account_id": a["id"], "status": "Called" })).await;
        post(&app, "/api/histories", json!({ "account_id": a["id"], "status": "Visited" })).await;
        post(&app, "/api/histories", json!({ "account_id": b["id"], "status": "Called" })).await;

        let uri = format!("/api/histories?account_id={}", a["id"]);
        let (_, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(body["data"]["total"], 2);
    }

    #[tokio::test]
    async fn test_foreign_activity_is_rejected() {
        let (app, _) = app().await;
        let a = post(&app, "/api/accounts", json!({ "company_name": "Acme" })).await;
        let b = post(&app, "/api/accounts", json!({ "company_name": "Globex" })).await;
        let activity =
            post(&app, "/api/activities", json!({ "account_id": b["id"], "subject": "Setup" })).await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/histories",
            Some(json!({ "account_id": a["id"], "activity_id": activity["id"], "status": "Done" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, Method::GET, "/api/histories", None).await;
        assert_eq!(body["data"]["total"], 0);
    }
}
