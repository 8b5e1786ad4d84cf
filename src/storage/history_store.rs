use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryOrder, TransactionTrait,
};
use serde::Deserialize;

use crate::entities::{activity, history};
use crate::error::{required, required_text, AppError, AppResult};
use crate::storage::{account_store, activity_store, non_blank};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewHistory {
    pub account_id: Option<i32>,
    pub activity_id: Option<i32>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryPatch {
    pub id: Option<i32>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

pub async fn list<C: ConnectionTrait>(db: &C) -> AppResult<Vec<history::Model>> {
    Ok(history::Entity::find()
        .order_by_asc(history::Column::Id)
        .all(db)
        .await?)
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<history::Model> {
    history::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("history {id} not found")))
}

/// Records an interaction. When it references an activity, that activity
/// takes the interaction's status; both writes commit together.
pub async fn create(
    db: &DatabaseConnection,
    input: NewHistory,
) -> AppResult<(history::Model, Option<activity::Model>)> {
    let account_id = required(input.account_id, "account_id")?;
    let status = required_text(input.status, "status")?;

    let txn = db.begin().await?;
    account_store::find(&txn, account_id).await?;

    let activity = match input.activity_id {
        Some(activity_id) => {
            let current = activity_store::find(&txn, activity_id).await?;
            if current.account_id != account_id {
                return Err(AppError::Validation(format!(
                    "activity {activity_id} does not belong to account {account_id}"
                )));
            }
            Some(activity_store::set_status(&txn, activity_id, &status).await?)
        }
        None => None,
    };

    let entry = history::ActiveModel {
        account_id: Set(account_id),
        activity_id: Set(input.activity_id),
        status: Set(status),
        notes: Set(non_blank(input.notes)),
        created_at: Set(chrono::Utc::now().into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok((entry, activity))
}

pub async fn update<C: ConnectionTrait>(db: &C, patch: HistoryPatch) -> AppResult<history::Model> {
    let id = required(patch.id, "id")?;
    let mut model = find(db, id).await?.into_active_model();

    if patch.status.is_some() {
        model.status = Set(required_text(patch.status, "status")?);
    }
    if patch.notes.is_some() {
        model.notes = Set(non_blank(patch.notes));
    }
    Ok(model.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::account_store::NewAccount;
    use crate::storage::activity_store::NewActivity;
    use crate::storage::memory_db;

    #[tokio::test]
    async fn test_history_updates_activity_status() -> AppResult<()> {
        let db = memory_db().await;
        let account = account_store::create(
            &db,
            NewAccount {
                company_name: Some("Initech".into()),
                ..Default::default()
            },
        )
        .await?;
        let activity = activity_store::create(
            &db,
            NewActivity {
                account_id: Some(account.id),
                subject: Some("Deliver laptops".into()),
                ..Default::default()
            },
        )
        .await?;

        let (entry, touched) = create(
            &db,
            NewHistory {
                account_id: Some(account.id),
                activity_id: Some(activity.id),
                status: Some("Delivered".into()),
                notes: Some("signed by reception".into()),
            },
        )
        .await?;

        assert_eq!(entry.status, "Delivered");
        assert_eq!(touched.map(|a| a.status), Some("Delivered".to_string()));
        assert_eq!(activity_store::find(&db, activity.id).await?.status, "Delivered");
        assert_eq!(list(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_activity_of_other_account_rolls_back() -> AppResult<()> {
        let db = memory_db().await;
        let first = account_store::create(
            &db,
            NewAccount {
                company_name: Some("A".into()),
                ..Default::default()
            },
        )
        .await?;
        let second = account_store::create(
            &db,
            NewAccount {
                company_name: Some("B".into()),
                ..Default::default()
            },
        )
        .await?;
        let activity = activity_store::create(
            &db,
            NewActivity {
                account_id: Some(first.id),
                subject: Some("Call".into()),
                ..Default::default()
            },
        )
        .await?;

        let err = create(
            &db,
            NewHistory {
                account_id: Some(second.id),
                activity_id: Some(activity.id),
                status: Some("Done".into()),
                notes: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(list(&db).await?.is_empty());
        Ok(())
    }
}
