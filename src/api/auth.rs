use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;

use super::{created, data, ApiJson};
use crate::auth::{self, LoginRequest, RegisterRequest};
use crate::error::AppResult;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let user = auth::register(&state.db, request, *state.config.bcrypt_cost()).await?;
    Ok(created(user))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = auth::login(&state.db, request).await?;
    Ok(data(user))
}
