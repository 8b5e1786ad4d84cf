use chrono::{Datelike, NaiveDate};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Deserialize;

use crate::entities::inventory::{self, AssetStatus, AssetType};
use crate::error::{required, AppError, AppResult};
use crate::storage::{is_unique_violation, non_blank, parse_optional_date};
use crate::tags::{parse_tag, TagSequence};

/// Attempts at generating and inserting a fresh tag before giving up.
pub const MAX_TAG_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewInventoryItem {
    pub asset_tag: Option<String>,
    pub asset_type: Option<AssetType>,
    pub status: Option<AssetStatus>,
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub serial_number: Option<String>,
    pub specs: Option<String>,
    pub purchase_date: Option<String>,
    pub new_user: Option<String>,
    pub old_user: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryPatch {
    pub id: Option<i32>,
    pub asset_tag: Option<String>,
    pub status: Option<AssetStatus>,
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub serial_number: Option<String>,
    pub specs: Option<String>,
    pub purchase_date: Option<String>,
    pub new_user: Option<String>,
    pub old_user: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub remarks: Option<String>,
}

pub async fn list<C: ConnectionTrait>(db: &C) -> AppResult<Vec<inventory::Model>> {
    Ok(inventory::Entity::find()
        .order_by_asc(inventory::Column::Id)
        .all(db)
        .await?)
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<inventory::Model> {
    inventory::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("inventory item {id} not found")))
}

/// Every stored tag that could belong to `asset_type`'s sequence for `year`.
pub async fn tags_for_year<C: ConnectionTrait>(
    db: &C,
    asset_type: AssetType,
    year: i32,
) -> AppResult<Vec<String>> {
    let pattern = TagSequence::new(asset_type.prefix(), year)?.like_pattern();
    let tags = inventory::Entity::find()
        .select_only()
        .column(inventory::Column::AssetTag)
        .filter(inventory::Column::AssetTag.like(&pattern))
        .into_tuple::<String>()
        .all(db)
        .await?;
    Ok(tags)
}

/// Next unused tag for `asset_type` in `year`. Nothing is reserved.
pub async fn next_asset_tag<C: ConnectionTrait>(
    db: &C,
    asset_type: AssetType,
    year: i32,
) -> AppResult<String> {
    let existing = tags_for_year(db, asset_type, year).await?;
    Ok(TagSequence::new(asset_type.prefix(), year)?.next(existing)?)
}

/// An explicit tag must be well formed and numbered above every tag already
/// issued for its prefix and year; earlier numbers are never backfilled.
async fn check_explicit_tag<C: ConnectionTrait>(
    db: &C,
    asset_type: AssetType,
    tag: &str,
) -> AppResult<()> {
    let prefix = asset_type.prefix();
    let Some((year, seq)) = parse_tag(prefix, tag) else {
        return Err(AppError::Validation(format!(
            "asset_tag must look like {prefix}-YYYY-NNN"
        )));
    };
    let existing = tags_for_year(db, asset_type, year).await?;
    let max = TagSequence::new(prefix, year)?.max(&existing);
    if seq <= max {
        return Err(AppError::Validation(format!(
            "asset_tag {tag} must be numbered above {prefix}-{year}-{max:03}"
        )));
    }
    Ok(())
}

fn active_model(
    input: &NewInventoryItem,
    asset_type: AssetType,
    asset_tag: String,
    purchase_date: Option<NaiveDate>,
) -> inventory::ActiveModel {
    inventory::ActiveModel {
        asset_tag: Set(asset_tag),
        asset_type: Set(asset_type),
        status: Set(input.status.unwrap_or(AssetStatus::Spare)),
        brand: Set(non_blank(input.brand.clone())),
        model_name: Set(non_blank(input.model_name.clone())),
        serial_number: Set(non_blank(input.serial_number.clone())),
        specs: Set(non_blank(input.specs.clone())),
        purchase_date: Set(purchase_date),
        new_user: Set(non_blank(input.new_user.clone())),
        old_user: Set(non_blank(input.old_user.clone())),
        department: Set(non_blank(input.department.clone())),
        position: Set(non_blank(input.position.clone())),
        remarks: Set(non_blank(input.remarks.clone())),
        ..inventory::ActiveModel::new()
    }
}

/// Inserts a new item. Without an explicit tag one is generated for
/// `today`'s year; a unique-constraint conflict from a concurrent insert
/// triggers a fresh generation, up to [`MAX_TAG_ATTEMPTS`] times.
pub async fn create<C: ConnectionTrait>(
    db: &C,
    input: NewInventoryItem,
    today: NaiveDate,
) -> AppResult<inventory::Model> {
    let asset_type = required(input.asset_type, "asset_type")?;
    let purchase_date = parse_optional_date(input.purchase_date.as_deref(), "purchase_date")?;

    if let Some(tag) = non_blank(input.asset_tag.clone()) {
        check_explicit_tag(db, asset_type, &tag).await?;
        let item = active_model(&input, asset_type, tag, purchase_date)
            .insert(db)
            .await?;
        return Ok(item);
    }

    for attempt in 1..=MAX_TAG_ATTEMPTS {
        let tag = next_asset_tag(db, asset_type, today.year()).await?;
        match active_model(&input, asset_type, tag.clone(), purchase_date)
            .insert(db)
            .await
        {
            Ok(item) => {
                tracing::info!(asset_tag = %item.asset_tag, "inventory item created");
                return Ok(item);
            }
            Err(err) if is_unique_violation(&err) => {
                tracing::warn!(asset_tag = %tag, attempt, "asset tag taken, regenerating");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Conflict(format!(
        "could not allocate a {} asset tag after {MAX_TAG_ATTEMPTS} attempts",
        asset_type
    )))
}

/// Applies the fields present in `patch`. Reassigning `new_user` moves the
/// previous holder to `old_user` unless the patch sets `old_user` itself.
pub async fn update<C: ConnectionTrait>(db: &C, patch: InventoryPatch) -> AppResult<inventory::Model> {
    let id = required(patch.id, "id")?;
    let current = find(db, id).await?;
    let previous_user = current.new_user.clone();
    let asset_type = current.asset_type;
    let current_tag = current.asset_tag.clone();
    let mut item = current.into_active_model();

    if let Some(tag) = non_blank(patch.asset_tag) {
        if tag != current_tag {
            check_explicit_tag(db, asset_type, &tag).await?;
            item.asset_tag = Set(tag);
        }
    }
    if let Some(status) = patch.status {
        item.status = Set(status);
    }
    if patch.brand.is_some() {
        item.brand = Set(non_blank(patch.brand));
    }
    if patch.model_name.is_some() {
        item.model_name = Set(non_blank(patch.model_name));
    }
    if patch.serial_number.is_some() {
        item.serial_number = Set(non_blank(patch.serial_number));
    }
    if patch.specs.is_some() {
        item.specs = Set(non_blank(patch.specs));
    }
    if patch.purchase_date.is_some() {
        item.purchase_date = Set(parse_optional_date(
            patch.purchase_date.as_deref(),
            "purchase_date",
        )?);
    }
    if patch.new_user.is_some() {
        let new_user = non_blank(patch.new_user);
        if patch.old_user.is_none() && new_user != previous_user {
            item.old_user = Set(previous_user);
        }
        item.new_user = Set(new_user);
    }
    if patch.old_user.is_some() {
        item.old_user = Set(non_blank(patch.old_user));
    }
    if patch.department.is_some() {
        item.department = Set(non_blank(patch.department));
    }
    if patch.position.is_some() {
        item.position = Set(non_blank(patch.position));
    }
    if patch.remarks.is_some() {
        item.remarks = Set(non_blank(patch.remarks));
    }

    Ok(item.update(db).await?)
}
