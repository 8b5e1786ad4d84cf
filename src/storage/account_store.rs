use chrono::NaiveDate;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryOrder,
};
use serde::Deserialize;

use crate::clusters::next_available_date;
use crate::entities::account;
use crate::error::{required, required_text, AppError, AppResult};
use crate::storage::non_blank;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAccount {
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub type_client: Option<String>,
    pub status: Option<String>,
    pub next_available_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
    pub id: Option<i32>,
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub type_client: Option<String>,
    pub status: Option<String>,
    pub next_available_date: Option<String>,
}

pub async fn list<C: ConnectionTrait>(db: &C) -> AppResult<Vec<account::Model>> {
    Ok(account::Entity::find()
        .order_by_asc(account::Column::Id)
        .all(db)
        .await?)
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<account::Model> {
    account::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("account {id} not found")))
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewAccount) -> AppResult<account::Model> {
    let model = account::ActiveModel {
        company_name: Set(required_text(input.company_name, "company_name")?),
        contact_person: Set(non_blank(input.contact_person)),
        type_client: Set(non_blank(input.type_client)),
        status: Set(non_blank(input.status)),
        next_available_date: Set(non_blank(input.next_available_date)),
        ..account::ActiveModel::new()
    };
    Ok(model.insert(db).await?)
}

pub async fn update<C: ConnectionTrait>(db: &C, patch: AccountPatch) -> AppResult<account::Model> {
    let id = required(patch.id, "id")?;
    let mut model = find(db, id).await?.into_active_model();

    if patch.company_name.is_some() {
        model.company_name = Set(required_text(patch.company_name, "company_name")?);
    }
    if patch.contact_person.is_some() {
        model.contact_person = Set(non_blank(patch.contact_person));
    }
    if patch.type_client.is_some() {
        model.type_client = Set(non_blank(patch.type_client));
    }
    if patch.status.is_some() {
        model.status = Set(non_blank(patch.status));
    }
    if patch.next_available_date.is_some() {
        model.next_available_date = Set(non_blank(patch.next_available_date));
    }

    Ok(model.update(db).await?)
}

/// Puts an account on today's call queue by pushing its next available
/// date out by its cluster's cadence.
pub async fn queue_for_today<C: ConnectionTrait>(
    db: &C,
    id: i32,
    today: NaiveDate,
) -> AppResult<account::Model> {
    let current = find(db, id).await?;
    let next = next_available_date(current.type_client.as_deref(), today);
    tracing::info!(account = id, next = %next, "account queued");

    let mut model = current.into_active_model();
    model.next_available_date = Set(Some(next.format("%Y-%m-%d").to_string()));
    Ok(model.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_db;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    async fn account(db: &sea_orm::DatabaseConnection, tier: &str) -> AppResult<account::Model> {
        create(
            db,
            NewAccount {
                company_name: Some("Acme".into()),
                type_client: Some(tier.into()),
                status: Some("On-Progress".into()),
                ..Default::default()
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_create_assigns_reference_id() -> AppResult<()> {
        let db = memory_db().await;
        let a = account(&db, "TOP 50").await?;
        let b = account(&db, "TOP 50").await?;
        assert!(!a.reference_id.is_empty());
        assert_ne!(a.reference_id, b.reference_id);
        assert!(a.next_available_date.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_queue_top_tier_is_fifteen_days() -> AppResult<()> {
        let db = memory_db().await;
        let a = account(&db, "TOP 50").await?;
        let queued = queue_for_today(&db, a.id, today()).await?;
        assert_eq!(queued.next_available_date.as_deref(), Some("2026-10-30"));
        Ok(())
    }

    #[tokio::test]
    async fn test_queue_other_tier_is_one_month() -> AppResult<()> {
        let db = memory_db().await;
        let a = account(&db, "NEXT 30").await?;
        let queued = queue_for_today(&db, a.id, today()).await?;
        assert_eq!(queued.next_available_date.as_deref(), Some("2026-11-15"));
        Ok(())
    }

    #[tokio::test]
    async fn test_queue_unknown_account() {
        let db = memory_db().await;
        let err = queue_for_today(&db, 99, today()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
