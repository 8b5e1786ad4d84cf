use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use super::{data, ApiJson};
use crate::dates::today;
use crate::error::{required_text, AppResult};
use crate::preferences::{dismiss_reminder, dismissed_reminders};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/preferences/:key", get(load).put(save))
        .route("/reminders/dismissed", get(dismissed))
        .route("/reminders/dismiss", post(dismiss))
}

#[derive(Debug, Deserialize)]
struct DismissRequest {
    id: Option<String>,
}

/// Unknown keys read as `null`.
async fn load(State(state): State<AppState>, Path(key): Path<String>) -> AppResult<impl IntoResponse> {
    let value = state.preferences.load(&key).await?;
    Ok(data(value.unwrap_or(Value::Null)))
}

async fn save(
    State(state): State<AppState>,
    Path(key): Path<String>,
    ApiJson(value): ApiJson<Value>,
) -> AppResult<impl IntoResponse> {
    state.preferences.save(&key, value.clone()).await?;
    Ok(data(value))
}

async fn dismissed(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let ids = dismissed_reminders(state.preferences.as_ref(), today()).await?;
    Ok(data(ids))
}

async fn dismiss(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DismissRequest>,
) -> AppResult<impl IntoResponse> {
    let id = required_text(request.id, "id")?;
    let ids = dismiss_reminder(state.preferences.as_ref(), today(), &id).await?;
    Ok(data(ids))
}
