use chrono::{Datelike, NaiveDate};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::entities::inventory::AssetStatus;
use crate::entities::{assigned_asset, assignment_batch, inventory};
use crate::error::{required, required_text, AppError, AppResult};
use crate::storage::{inventory_store, is_unique_violation, non_blank, parse_optional_date};
use crate::tags::{TagSequence, ASSIGNMENT_PREFIX};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAssignment {
    pub assigned_to: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub inventory_ids: Option<Vec<i32>>,
    pub assigned_date: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentPatch {
    pub id: Option<i32>,
    pub assigned_to: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub assigned_date: Option<String>,
    pub remarks: Option<String>,
}

/// Result of one deployment: its rows and the inventory items it moved.
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub assigned_number: String,
    pub rows: Vec<assigned_asset::Model>,
    pub items: Vec<inventory::Model>,
}

pub async fn list<C: ConnectionTrait>(db: &C) -> AppResult<Vec<assigned_asset::Model>> {
    Ok(assigned_asset::Entity::find()
        .order_by_asc(assigned_asset::Column::Id)
        .all(db)
        .await?)
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<assigned_asset::Model> {
    assigned_asset::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("assigned asset {id} not found")))
}

/// Attempts at reserving a fresh assigned number before giving up.
pub const MAX_NUMBER_ATTEMPTS: usize = 5;

/// Next assigned number for `year`, after every reservation ever made.
pub async fn next_assigned_number<C: ConnectionTrait>(db: &C, year: i32) -> AppResult<String> {
    let sequence = TagSequence::new(ASSIGNMENT_PREFIX, year)?;
    let existing = assignment_batch::Entity::find()
        .select_only()
        .column(assignment_batch::Column::AssignedNumber)
        .filter(assignment_batch::Column::AssignedNumber.like(sequence.like_pattern()))
        .into_tuple::<String>()
        .all(db)
        .await?;
    Ok(sequence.next(existing)?)
}

/// Validated input of one deployment.
struct Deployment {
    assigned_to: String,
    inventory_ids: Vec<i32>,
    assigned_date: NaiveDate,
    department: Option<String>,
    position: Option<String>,
    remarks: Option<String>,
}

/// Deploys a batch of inventory items to one person under a single
/// assigned number. Each item becomes DEPLOYED and its previous holder moves
/// to `old_user`. All rows commit together or not at all; a number taken by
/// a concurrent deployment restarts the transaction with a fresh one, up to
/// [`MAX_NUMBER_ATTEMPTS`] times.
pub async fn create(
    db: &DatabaseConnection,
    input: NewAssignment,
    today: NaiveDate,
) -> AppResult<Assignment> {
    let assigned_to = required_text(input.assigned_to, "assigned_to")?;
    let mut inventory_ids = required(input.inventory_ids, "inventory_ids")?;
    inventory_ids.sort_unstable();
    inventory_ids.dedup();
    if inventory_ids.is_empty() {
        return Err(AppError::validation("inventory_ids cannot be empty"));
    }
    let deployment = Deployment {
        assigned_to,
        inventory_ids,
        assigned_date: parse_optional_date(input.assigned_date.as_deref(), "assigned_date")?
            .unwrap_or(today),
        department: non_blank(input.department),
        position: non_blank(input.position),
        remarks: non_blank(input.remarks),
    };

    for attempt in 1..=MAX_NUMBER_ATTEMPTS {
        if let Some(assignment) = deploy(db, &deployment).await? {
            tracing::info!(
                assigned_number = %assignment.assigned_number,
                items = assignment.rows.len(),
                "assets assigned"
            );
            return Ok(assignment);
        }
        tracing::warn!(attempt, "assigned number taken, retrying");
    }

    Err(AppError::Conflict(format!(
        "could not reserve an assigned number after {MAX_NUMBER_ATTEMPTS} attempts"
    )))
}

/// One transactional attempt. `None` when the number was reserved by someone
/// else first; the transaction is rolled back on drop.
async fn deploy(db: &DatabaseConnection, deployment: &Deployment) -> AppResult<Option<Assignment>> {
    let txn = db.begin().await?;
    let assigned_number = next_assigned_number(&txn, deployment.assigned_date.year()).await?;

    let reservation = assignment_batch::ActiveModel {
        assigned_number: Set(assigned_number.clone()),
        assigned_to: Set(deployment.assigned_to.clone()),
        created_at: Set(chrono::Utc::now().into()),
        ..Default::default()
    }
    .insert(&txn)
    .await;
    match reservation {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let mut rows = Vec::with_capacity(deployment.inventory_ids.len());
    let mut items = Vec::with_capacity(deployment.inventory_ids.len());
    for &id in &deployment.inventory_ids {
        let item = inventory_store::find(&txn, id).await?;
        if matches!(item.status, AssetStatus::Dispose | AssetStatus::Missing) {
            return Err(AppError::Validation(format!(
                "{} cannot be assigned while {:?}",
                item.asset_tag, item.status
            )));
        }

        let row = assigned_asset::ActiveModel {
            assigned_number: Set(assigned_number.clone()),
            inventory_id: Set(item.id),
            asset_tag: Set(item.asset_tag.clone()),
            assigned_to: Set(deployment.assigned_to.clone()),
            department: Set(deployment.department.clone()),
            position: Set(deployment.position.clone()),
            assigned_date: Set(deployment.assigned_date),
            remarks: Set(deployment.remarks.clone()),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let previous_user = item.new_user.clone();
        let mut deployed = item.into_active_model();
        deployed.status = Set(AssetStatus::Deployed);
        deployed.old_user = Set(previous_user);
        deployed.new_user = Set(Some(deployment.assigned_to.clone()));
        deployed.department = Set(deployment.department.clone());
        deployed.position = Set(deployment.position.clone());

        items.push(deployed.update(&txn).await?);
        rows.push(row);
    }

    txn.commit().await?;
    Ok(Some(Assignment {
        assigned_number,
        rows,
        items,
    }))
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    patch: AssignmentPatch,
) -> AppResult<assigned_asset::Model> {
    let id = required(patch.id, "id")?;
    let mut model = find(db, id).await?.into_active_model();

    if patch.assigned_to.is_some() {
        model.assigned_to = Set(required_text(patch.assigned_to, "assigned_to")?);
    }
    if patch.department.is_some() {
        model.department = Set(non_blank(patch.department));
    }
    if patch.position.is_some() {
        model.position = Set(non_blank(patch.position));
    }
    if let Some(date) = parse_optional_date(patch.assigned_date.as_deref(), "assigned_date")? {
        model.assigned_date = Set(date);
    }
    if patch.remarks.is_some() {
        model.remarks = Set(non_blank(patch.remarks));
    }
    Ok(model.update(db).await?)
}
