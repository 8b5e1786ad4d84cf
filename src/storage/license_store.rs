use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryOrder,
};
use serde::Deserialize;

use crate::entities::license;
use crate::error::{required, required_text, AppError, AppResult};
use crate::storage::{non_blank, parse_optional_date};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLicense {
    pub software_name: Option<String>,
    pub license_key: Option<String>,
    pub vendor: Option<String>,
    pub seats: Option<i32>,
    pub assigned_to: Option<String>,
    pub department: Option<String>,
    pub purchase_date: Option<String>,
    pub expiry_date: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicensePatch {
    pub id: Option<i32>,
    pub software_name: Option<String>,
    pub license_key: Option<String>,
    pub vendor: Option<String>,
    pub seats: Option<i32>,
    pub assigned_to: Option<String>,
    pub department: Option<String>,
    pub purchase_date: Option<String>,
    pub expiry_date: Option<String>,
    pub remarks: Option<String>,
}

fn check_seats(seats: i32) -> AppResult<i32> {
    if seats < 0 {
        return Err(AppError::validation("seats cannot be negative"));
    }
    Ok(seats)
}

pub async fn list<C: ConnectionTrait>(db: &C) -> AppResult<Vec<license::Model>> {
    Ok(license::Entity::find()
        .order_by_asc(license::Column::Id)
        .all(db)
        .await?)
}

pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<license::Model> {
    license::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("license {id} not found")))
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewLicense) -> AppResult<license::Model> {
    let software_name = required_text(input.software_name, "software_name")?;
    let mut model = license::ActiveModel {
        software_name: Set(software_name),
        license_key: Set(non_blank(input.license_key)),
        vendor: Set(non_blank(input.vendor)),
        assigned_to: Set(non_blank(input.assigned_to)),
        department: Set(non_blank(input.department)),
        purchase_date: Set(parse_optional_date(input.purchase_date.as_deref(), "purchase_date")?),
        expiry_date: Set(parse_optional_date(input.expiry_date.as_deref(), "expiry_date")?),
        remarks: Set(non_blank(input.remarks)),
        ..license::ActiveModel::new()
    };
    if let Some(seats) = input.seats {
        model.seats = Set(check_seats(seats)?);
    }
    Ok(model.insert(db).await?)
}

pub async fn update<C: ConnectionTrait>(db: &C, patch: LicensePatch) -> AppResult<license::Model> {
    let id = required(patch.id, "id")?;
    let mut model = find(db, id).await?.into_active_model();

    if patch.software_name.is_some() {
        model.software_name = Set(required_text(patch.software_name, "software_name")?);
    }
    if patch.license_key.is_some() {
        model.license_key = Set(non_blank(patch.license_key));
    }
    if patch.vendor.is_some() {
        model.vendor = Set(non_blank(patch.vendor));
    }
    if let Some(seats) = patch.seats {
        model.seats = Set(check_seats(seats)?);
    }
    if patch.assigned_to.is_some() {
        model.assigned_to = Set(non_blank(patch.assigned_to));
    }
    if patch.department.is_some() {
        model.department = Set(non_blank(patch.department));
    }
    if patch.purchase_date.is_some() {
        model.purchase_date = Set(parse_optional_date(patch.purchase_date.as_deref(), "purchase_date")?);
    }
    if patch.expiry_date.is_some() {
        model.expiry_date = Set(parse_optional_date(patch.expiry_date.as_deref(), "expiry_date")?);
    }
    if patch.remarks.is_some() {
        model.remarks = Set(non_blank(patch.remarks));
    }

    Ok(model.update(db).await?)
}
