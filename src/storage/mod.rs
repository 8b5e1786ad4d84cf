use std::time::Duration;

use chrono::NaiveDate;
use sea_orm::sea_query::IntoCondition;
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, Schema, SqlErr,
};
use serde::Deserialize;

use crate::dates::parse_date;
use crate::entities::{
    account, activity, assigned_asset, assignment_batch, history, inventory, license, user,
};
use crate::error::{AppError, AppResult};

pub mod account_store;
pub mod activity_store;
pub mod assignment_store;
pub mod history_store;
pub mod inventory_store;
pub mod license_store;
pub mod user_store;

pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    if database_url.starts_with("sqlite::memory:") {
        // every pooled connection would otherwise get its own empty database
        options.max_connections(1).min_connections(1);
    } else {
        options
            .max_connections(10)
            .connect_timeout(Duration::from_secs(10));
    }
    options.sqlx_logging(false);

    let db = Database::connect(options).await?;
    init_database(&db).await?;
    Ok(db)
}

/// Creates any missing table (and its indexes) from the entity definitions.
pub async fn init_database(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, inventory::Entity).await?;
    create_table(db, &schema, license::Entity).await?;
    create_table(db, &schema, assigned_asset::Entity).await?;
    create_table(db, &schema, assignment_batch::Entity).await?;
    create_table(db, &schema, account::Entity).await?;
    create_table(db, &schema, activity::Entity).await?;
    create_table(db, &schema, history::Entity).await?;
    create_table(db, &schema, user::Entity).await?;

    tracing::info!("database schema ready");
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(E::default()) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }
    Ok(())
}

/// `{id}` or `{ids: [..]}`, as sent by the delete endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteRequest {
    pub id: Option<i32>,
    pub ids: Option<Vec<i32>>,
}

impl DeleteRequest {
    pub fn into_ids(self) -> AppResult<Vec<i32>> {
        let mut ids = self.ids.unwrap_or_default();
        ids.extend(self.id);
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Err(AppError::validation("id or ids is required"));
        }
        Ok(ids)
    }
}

/// Deletes the rows of `E` whose `id_column` is in `ids`; returns the count.
pub async fn delete_ids<E, C>(db: &C, id_column: E::Column, ids: &[i32]) -> AppResult<u64>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let condition = id_column.is_in(ids.iter().copied()).into_condition();
    let result = E::delete_many().filter(condition).exec(db).await?;
    Ok(result.rows_affected)
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Trimmed text; blank becomes `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Absent or blank is `None`; anything else must parse as a date.
pub fn parse_optional_date(raw: Option<&str>, field: &str) -> AppResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_date(raw)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("{field} is not a valid date: {raw}"))),
    }
}

#[cfg(test)]
pub(crate) async fn memory_db() -> DatabaseConnection {
    connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite database")
}
