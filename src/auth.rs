//! Email/password accounts with bcrypt hashes.

use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::entities::user;
use crate::error::{required_text, AppError, AppResult};
use crate::storage::user_store;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
}

pub async fn register(
    db: &DatabaseConnection,
    request: RegisterRequest,
    bcrypt_cost: u32,
) -> AppResult<user::Model> {
    let email = required_text(request.email, "email")?;
    if !email.contains('@') {
        return Err(AppError::validation("email is not valid"));
    }
    let name = required_text(request.name, "name")?;
    let password = request.password.unwrap_or_default();
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if user_store::find_by_email(db, &email).await?.is_some() {
        return Err(AppError::Conflict(format!("{email} is already registered")));
    }

    let hash = hash_password(password, bcrypt_cost).await?;
    let user = user_store::insert(db, &email, &name, hash).await?;
    tracing::info!(user = %user.reference_id, "user registered");
    Ok(user)
}

/// Same error for unknown email and wrong password.
pub async fn login(db: &DatabaseConnection, request: LoginRequest) -> AppResult<user::Model> {
    let email = required_text(request.email, "email")?;
    let password = request.password.unwrap_or_default();
    let invalid = || AppError::Unauthorized("invalid email or password".into());

    let user = user_store::find_by_email(db, &email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(password, user.password_hash.clone()).await? {
        tracing::warn!(user = %user.reference_id, "failed login");
        return Err(invalid());
    }
    Ok(user)
}
