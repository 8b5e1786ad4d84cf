use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use sea_orm::EntityName;
use serde::Deserialize;

use super::{created, data, ApiJson, ApiQuery, Deleted};
use crate::cache::{CacheKey, WritePath};
use crate::clusters::build_schedule;
use crate::dates::today;
use crate::entities::account;
use crate::error::{required, AppResult};
use crate::notifications::ChangeEvent;
use crate::query::{self, ListParams, Searchable};
use crate::storage::account_store::{self, AccountPatch, NewAccount};
use crate::storage::{delete_ids, DeleteRequest};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts",
            get(list_accounts)
                .post(create_account)
                .put(update_account)
                .delete(delete_accounts),
        )
        .route("/accounts/schedule", get(schedule))
        .route("/accounts/queue", post(queue))
}

impl Searchable for account::Model {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.company_name.as_str()),
            Some(self.reference_id.as_str()),
            self.contact_person.as_deref(),
            self.type_client.as_deref(),
            self.status.as_deref(),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct QueueRequest {
    id: Option<i32>,
}

fn table() -> String {
    account::Entity.table_name().to_string()
}

async fn accounts(state: &AppState) -> AppResult<Vec<account::Model>> {
    state
        .cache
        .get_or_load(CacheKey::Accounts, || account_store::list(&state.db))
        .await
}

async fn list_accounts(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<impl IntoResponse> {
    let rows = accounts(&state).await?;
    Ok(data(query::list(rows, &params)))
}

/// Today's call queue and the never-scheduled pool, grouped by cluster.
async fn schedule(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let rows = accounts(&state).await?;
    Ok(data(build_schedule(&rows, today())))
}

async fn queue(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<QueueRequest>,
) -> AppResult<impl IntoResponse> {
    let id = required(request.id, "id")?;
    let account = account_store::queue_for_today(&state.db, id, today()).await?;
    state
        .after_write(WritePath::Account, [ChangeEvent::update(&table(), &account)])
        .await;
    Ok(data(account))
}

async fn create_account(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewAccount>,
) -> AppResult<impl IntoResponse> {
    let account = account_store::create(&state.db, input).await?;
    state
        .after_write(WritePath::Account, [ChangeEvent::insert(&table(), &account)])
        .await;
    Ok(created(account))
}

async fn update_account(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<AccountPatch>,
) -> AppResult<impl IntoResponse> {
    let account = account_store::update(&state.db, patch).await?;
    state
        .after_write(WritePath::Account, [ChangeEvent::update(&table(), &account)])
        .await;
    Ok(data(account))
}

async fn delete_accounts(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteRequest>,
) -> AppResult<impl IntoResponse> {
    let ids = request.into_ids()?;
    let deleted = delete_ids::<account::Entity, _>(&state.db, account::Column::Id, &ids).await?;
    state
        .after_write(
            WritePath::Account,
            ids.iter().map(|id| ChangeEvent::delete(&table(), *id)),
        )
        .await;
    Ok(data(Deleted { deleted, ids }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, send};
    use crate::dates::today;
    use axum::http::{Method, StatusCode};
    use chrono::{Days, Months};
    use serde_json::{json, Value};

    async fn account(app: &axum::Router, body: Value) -> Value {
        let (status, body) = send(app, Method::POST, "/api/accounts", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"].clone()
    }

    fn group<'a>(groups: &'a Value, cluster: &str) -> Vec<&'a Value> {
        groups
            .as_array()
            .unwrap()
            .iter()
            .filter(|g| g["cluster"] == cluster)
            .flat_map(|g| g["accounts"].as_array().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_schedule_groups_by_cluster() {
        let (app, _) = app().await;
        let today = today().format("%Y-%m-%d").to_string();

        account(
            &app,
            json!({ "company_name": "Acme", "type_client": "NEXT 30", "status": "on-progress", "next_available_date": today }),
        )
        .await;
        account(
            &app,
            json!({ "company_name": "Globex", "type_client": "NEXT 30", "status": "Pending", "next_available_date": today }),
        )
        .await;
        account(&app, json!({ "company_name": "Initech", "type_client": "TOP 50" })).await;

        let (status, body) = send(&app, Method::GET, "/api/accounts/schedule", None).await;
        assert_eq!(status, StatusCode::OK);
        let schedule = &body["data"];
        assert_eq!(schedule["today"], today);

        let due = group(&schedule["due_today"], "NEXT 30");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0]["company_name"], "Acme");

        let available = group(&schedule["available"], "TOP 50");
        assert_eq!(available.len(), 1);
        assert_eq!(available[0]["company_name"], "Initech");
        assert!(group(&schedule["due_today"], "TOP 50").is_empty());
    }

    #[tokio::test]
    async fn test_queue_pushes_next_available_date() {
        let (app, _) = app().await;
        let top = account(&app, json!({ "company_name": "Umbrella", "type_client": "TOP 50" })).await;
        let other = account(&app, json!({ "company_name": "Hooli", "type_client": "BALANCE 20" })).await;

        // prime the cache so the queue write has to invalidate it
        send(&app, Method::GET, "/api/accounts/schedule", None).await;

        let (status, body) =
            send(&app, Method::POST, "/api/accounts/queue", Some(json!({ "id": top["id"] }))).await;
        assert_eq!(status, StatusCode::OK);
        let expected = today().checked_add_days(Days::new(15)).unwrap();
        assert_eq!(body["data"]["next_available_date"], expected.format("%Y-%m-%d").to_string());

        let (_, body) =
            send(&app, Method::POST, "/api/accounts/queue", Some(json!({ "id": other["id"] }))).await;
        let expected = today().checked_add_months(Months::new(1)).unwrap();
        assert_eq!(body["data"]["next_available_date"], expected.format("%Y-%m-%d").to_string());

        let (_, body) = send(&app, Method::GET, "/api/accounts/schedule", None).await;
        assert!(group(&body["data"]["available"], "TOP 50").is_empty());
    }

    #[tokio::test]
    async fn test_queue_unknown_account() {
        let (app, _) = app().await;
        let (status, _) =
            send(&app, Method::POST, "/api/accounts/queue", Some(json!({ "id": 12 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::POST, "/api/accounts/queue", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_account_gets_reference_id() {
        let (app, _) = app().await;
        let created = account(&app, json!({ "company_name": "Stark" })).await;
        assert_eq!(created["reference_id"].as_str().unwrap().len(), 36);

        let (_, body) = send(
            &app,
            Method::PUT,
            "/api/accounts",
            Some(json!({ "id": created["id"], "status": "Pending" })),
        )
        .await;
        assert_eq!(body["data"]["reference_id"], created["reference_id"]);
        assert_eq!(body["data"]["status"], "Pending");
    }
}
