use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use sea_orm::EntityName;
use serde::Deserialize;

use super::{created, data, ApiJson, ApiQuery, Deleted};
use crate::cache::{CacheKey, WritePath};
use crate::entities::activity;
use crate::error::AppResult;
use crate::notifications::ChangeEvent;
use crate::query::{self, ListParams, Searchable};
use crate::storage::activity_store::{self, ActivityPatch, NewActivity};
use crate::storage::{delete_ids, DeleteRequest};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/activities",
        get(list_activities)
            .post(create_activity)
            .put(update_activity)
            .delete(delete_activities),
    )
}

impl Searchable for activity::Model {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.subject.as_str()),
            Some(self.status.as_str()),
            self.description.as_deref(),
        ]
    }
}

#[derive(Debug, Default, Deserialize)]
struct ActivityFilter {
    completed: Option<bool>,
    account_id: Option<i32>,
}

fn table() -> String {
    activity::Entity.table_name().to_string()
}

async fn list_activities(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
    ApiQuery(filter): ApiQuery<ActivityFilter>,
) -> AppResult<impl IntoResponse> {
    let rows: Vec<_> = state
        .cache
        .get_or_load(CacheKey::Activities, || activity_store::list(&state.db))
        .await?
        .into_iter()
        .filter(|a: &activity::Model| filter.completed.map_or(true, |c| a.is_completed() == c))
        .filter(|a| filter.account_id.map_or(true, |id| a.account_id == id))
        .collect();
    Ok(data(query::list(rows, &params)))
}

async fn create_activity(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewActivity>,
) -> AppResult<impl IntoResponse> {
    let activity = activity_store::create(&state.db, input).await?;
    state
        .after_write(WritePath::Activity, [ChangeEvent::insert(&table(), &activity)])
        .await;
    Ok(created(activity))
}

async fn update_activity(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<ActivityPatch>,
) -> AppResult<impl IntoResponse> {
    let activity = activity_store::update(&state.db, patch).await?;
    state
        .after_write(WritePath::Activity, [ChangeEvent::update(&table(), &activity)])
        .await;
    Ok(data(activity))
}

async fn delete_activities(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteRequest>,
) -> AppResult<impl IntoResponse> {
    let ids = request.into_ids()?;
    let deleted = delete_ids::<activity::Entity, _>(&state.db, activity::Column::Id, &ids).await?;
    state
        .after_write(
            WritePath::Activity,
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

    async fn account_id(app: &axum::Router) -> Value {
        let (_, body) = send(app, Method::POST, "/api/accounts", Some(json!({ "company_name": "Acme" }))).await;
        body["data"]["id"].clone()
    }

    #[tokio::test]
    async fn test_completed_filter() {
        let (app, _) = app().await;
        let account = account_id(&app).await;

        for (subject, status) in [("Install", "On-Progress"), ("Deliver", "Delivered"), ("Audit", "DONE")] {
            let (status_code, _) = send(
                &app,
                Method::POST,
                "/api/activities",
                Some(json!({ "account_id": account, "subject": subject, "status": status })),
            )
            .await;
            assert_eq!(status_code, StatusCode::CREATED);
        }

        let (_, body) = send(&app, Method::GET, "/api/activities?completed=true", None).await;
        assert_eq!(body["data"]["total"], 2);

        let (_, body) = send(&app, Method::GET, "/api/activities?completed=false", None).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["subject"], "Install");

        let (_, body) = send(&app, Method::GET, "/api/activities?account_id=999", None).await;
        assert_eq!(body["data"]["total"], 0);
    }

    #[tokio::test]
    async fn test_default_status_and_pagination() {
        let (app, _) = app().await;
        let account = account_id(&app).await;
        for n in 0..5 {
            send(
                &app,
                Method::POST,
                "/api/activities",
                Some(json!({ "account_id": account, "subject": format!("Visit {n}") })),
            )
            .await;
        }

        let (_, body) = send(&app, Method::GET, "/api/activities?page=2&per_page=2", None).await;
        let listing = &body["data"];
        assert_eq!(listing["total"], 5);
        assert_eq!(listing["total_pages"], 3);
        assert_eq!(listing["items"][0]["subject"], "Visit 2");
        assert_eq!(listing["items"][0]["status"], "On-Progress");
    }

    #[tokio::test]
    async fn test_activity_needs_existing_account() {
        let (app, _) = app().await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/activities",
            Some(json!({ "account_id": 41, "subject": "Orphan" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
