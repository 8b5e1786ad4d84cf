use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use sea_orm::EntityName;

use super::{created, data, ApiJson, ApiQuery, Deleted};
use crate::cache::{CacheKey, WritePath};
use crate::entities::license;
use crate::error::AppResult;
use crate::notifications::ChangeEvent;
use crate::query::{self, ListParams, Searchable};
use crate::storage::license_store::{self, LicensePatch, NewLicense};
use crate::storage::{delete_ids, DeleteRequest};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/licenses",
        get(list_licenses)
            .post(create_license)
            .put(update_license)
            .delete(delete_licenses),
    )
}

impl Searchable for license::Model {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.software_name.as_str()),
            self.license_key.as_deref(),
            self.vendor.as_deref(),
            self.assigned_to.as_deref(),
            self.department.as_deref(),
            self.remarks.as_deref(),
        ]
    }
}

fn table() -> String {
    license::Entity.table_name().to_string()
}

async fn list_licenses(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<impl IntoResponse> {
    let rows = state
        .cache
        .get_or_load(CacheKey::Licenses, || license_store::list(&state.db))
        .await?;
    Ok(data(query::list(rows, &params)))
}

async fn create_license(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewLicense>,
) -> AppResult<impl IntoResponse> {
    let license = license_store::create(&state.db, input).await?;
    state
        .after_write(WritePath::License, [ChangeEvent::insert(&table(), &license)])
        .await;
    Ok(created(license))
}

async fn update_license(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<LicensePatch>,
) -> AppResult<impl IntoResponse> {
    let license = license_store::update(&state.db, patch).await?;
    state
        .after_write(WritePath::License, [ChangeEvent::update(&table(), &license)])
        .await;
    Ok(data(license))
}

async fn delete_licenses(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteRequest>,
) -> AppResult<impl IntoResponse> {
    let ids = request.into_ids()?;
    let deleted = delete_ids::<license::Entity, _>(&state.db, license::Column::Id, &ids).await?;
    state
        .after_write(
            WritePath::License,
            ids.iter().map(|id| ChangeEvent::delete(&table(), *id)),
        )
        .await;
    Ok(data(Deleted { deleted, ids }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_license_lifecycle() {
        let (app, _) = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/licenses",
            Some(json!({ "software_name": "Office 365", "vendor": "Microsoft", "seats": 25 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["seats"], 25);

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/licenses",
            Some(json!({ "id": id, "assigned_to": "Finance", "expiry_date": "2027-01-31" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["expiry_date"], "2027-01-31");
        assert_eq!(body["data"]["vendor"], "Microsoft");

        let (_, body) = send(&app, Method::GET, "/api/licenses?search=finance", None).await;
        assert_eq!(body["data"]["total"], 1);

        let (status, body) =
            send(&app, Method::DELETE, "/api/licenses", Some(json!({ "id": id }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["ids"], json!([id]));
    }

    #[tokio::test]
    async fn test_license_requires_software_name() {
        let (app, _) = app().await;
        let (status, body) =
            send(&app, Method::POST, "/api/licenses", Some(json!({ "vendor": "Adobe" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "software_name is required");
    }

    #[tokio::test]
    async fn test_delete_without_ids_is_bad_request() {
        let (app, _) = app().await;
        let (status, _) = send(&app, Method::DELETE, "/api/licenses", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
