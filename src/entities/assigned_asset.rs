use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One inventory item handed out in a deployment. Rows of the same
/// deployment share `assigned_number`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assigned_assets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub assigned_number: String,
    pub inventory_id: i32,
    pub asset_tag: String,
    pub assigned_to: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub assigned_date: Date,
    pub remarks: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
