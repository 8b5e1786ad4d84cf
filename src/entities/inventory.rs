use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use crate::dates::warranty_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    #[sea_orm(string_value = "LAPTOP")]
    Laptop,
    #[sea_orm(string_value = "MONITOR")]
    Monitor,
    #[sea_orm(string_value = "DESKTOP")]
    Desktop,
}

impl AssetType {
    /// Tag prefix, e.g. `LAP` in `LAP-2026-001`.
    pub fn prefix(&self) -> &'static str {
        match self {
            AssetType::Laptop => "LAP",
            AssetType::Monitor => "MON",
            AssetType::Desktop => "DES",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Laptop => "LAPTOP",
            AssetType::Monitor => "MONITOR",
            AssetType::Desktop => "DESKTOP",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LAPTOP" => Ok(AssetType::Laptop),
            "MONITOR" => Ok(AssetType::Monitor),
            "DESKTOP" => Ok(AssetType::Desktop),
            other => Err(format!("invalid asset_type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetStatus {
    #[sea_orm(string_value = "SPARE")]
    Spare,
    #[sea_orm(string_value = "DEPLOYED")]
    Deployed,
    #[sea_orm(string_value = "LEND")]
    Lend,
    #[sea_orm(string_value = "MISSING")]
    Missing,
    #[sea_orm(string_value = "DEFECTIVE")]
    Defective,
    #[sea_orm(string_value = "DISPOSE")]
    Dispose,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub asset_tag: String,
    pub asset_type: AssetType,
    pub status: AssetStatus,
    pub brand: Option<String>,
    pub model_name: Option<String>,
    pub serial_number: Option<String>,
    pub specs: Option<String>,
    pub purchase_date: Option<Date>,
    pub warranty_date: Option<Date>,
    pub new_user: Option<String>,
    pub old_user: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub remarks: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        use chrono::Utc;
        let now = Utc::now().into();
        Self {
            status: Set(AssetStatus::Spare),
            created_at: Set(now),
            updated_at: Set(now),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            self.updated_at = Set(chrono::Utc::now().into());
        }
        // warranty always follows the purchase date
        if let Set(purchase) = &self.purchase_date {
            let warranty = (*purchase).map(warranty_date);
            self.warranty_date = Set(warranty);
        }
        Ok(self)
    }
}
