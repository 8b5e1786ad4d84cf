use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entities::user;
use crate::error::AppResult;

pub const DEFAULT_ROLE: &str = "staff";

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> AppResult<Option<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?)
}

/// Inserts a user whose password is already hashed. A taken email surfaces
/// as a conflict from the unique index.
pub async fn insert<C: ConnectionTrait>(
    db: &C,
    email: &str,
    name: &str,
    password_hash: String,
) -> AppResult<user::Model> {
    let model = user::ActiveModel {
        reference_id: Set(uuid::Uuid::new_v4().to_string()),
        email: Set(normalize_email(email)),
        name: Set(name.to_string()),
        role: Set(DEFAULT_ROLE.to_string()),
        password_hash: Set(password_hash),
        created_at: Set(chrono::Utc::now().into()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
