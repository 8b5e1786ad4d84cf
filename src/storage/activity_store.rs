use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryOrder,
};
use serde::Deserialize;

use crate::entities::activity;
use crate::error::{required, required_text, AppError, AppResult};
use crate::storage::{account_store, non_blank, parse_optional_date};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewActivity {
    pub account_id: Option<i32>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub scheduled_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityPatch {
    pub id: Option<i32>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub scheduled_date: Option<String>,
}

pub async fn list<C: ConnectionTrait>(db: &C) -> AppResult<Vec<activity::Model>> {
    Ok(activity::Entity::find()
        .order_by_asc(activity::Column::Id)
        .all(db)
        .await?)
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<activity::Model> {
    activity::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("activity {id} not found")))
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewActivity) -> AppResult<activity::Model> {
    let account_id = required(input.account_id, "account_id")?;
    account_store::find(db, account_id).await?;

    let mut model = activity::ActiveModel {
        account_id: Set(account_id),
        subject: Set(required_text(input.subject, "subject")?),
        description: Set(non_blank(input.description)),
        scheduled_date: Set(parse_optional_date(input.scheduled_date.as_deref(), "scheduled_date")?),
        ..activity::ActiveModel::new()
    };
    if let Some(status) = non_blank(input.status) {
        model.status = Set(status);
    }
    Ok(model.insert(db).await?)
}

pub async fn update<C: ConnectionTrait>(db: &C, patch: ActivityPatch) -> AppResult<activity::Model> {
    let id = required(patch.id, "id")?;
    let mut model = find(db, id).await?.into_active_model();

    if patch.subject.is_some() {
        model.subject = Set(required_text(patch.subject, "subject")?);
    }
    if patch.description.is_some() {
        model.description = Set(non_blank(patch.description));
    }
    if patch.status.is_some() {
        model.status = Set(required_text(patch.status, "status")?);
    }
    if patch.scheduled_date.is_some() {
        model.scheduled_date = Set(parse_optional_date(
            patch.scheduled_date.as_deref(),
            "scheduled_date",
        )?);
    }

    Ok(model.update(db).await?)
}

/// Sets only the status; used when a history entry closes out an activity.
pub async fn set_status<C: ConnectionTrait>(
    db: &C,
    id: i32,
    status: &str,
) -> AppResult<activity::Model> {
    let mut model = find(db, id).await?.into_active_model();
    model.status = Set(status.to_string());
    Ok(model.update(db).await?)
}
