use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

const COMPLETED_STATUSES: [&str; 4] = ["done", "delivered", "completed", "closed"];

/// True for statuses that close out an activity (`Done`, `Delivered`, ...).
pub fn is_completed(status: &str) -> bool {
    let status = status.trim().to_ascii_lowercase();
    COMPLETED_STATUSES.contains(&status.as_str())
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub account_id: i32,
    pub subject: String,
    pub description: Option<String>,
    pub status: String,
    pub scheduled_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_completed(&self) -> bool {
        is_completed(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        let now = chrono::Utc::now().into();
        Self {
            status: Set("On-Progress".to_string()),
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
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_statuses() {
        assert!(is_completed("Done"));
        assert!(is_completed("delivered"));
        assert!(is_completed(" COMPLETED "));
        assert!(!is_completed("On-Progress"));
        assert!(!is_completed("Pending"));
        assert!(!is_completed(""));
    }
}
