pub mod api;
pub mod auth;
pub mod cache;
pub mod clusters;
pub mod config;
pub mod dates;
pub mod entities;
pub mod error;
pub mod notifications;
pub mod preferences;
pub mod query;
pub mod storage;
pub mod tags;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use cache::{ListCache, WritePath};
use config::AppConfig;
use notifications::{ChangeEvent, NotificationHub};
use preferences::file::FilePreferences;
use preferences::memory::MemoryPreferences;
use preferences::PreferenceStore;

pub use api::router;
pub use error::{AppError, AppResult};

/// Shared handles every request handler works with.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub cache: ListCache,
    pub hub: NotificationHub,
    pub preferences: Arc<dyn PreferenceStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let preferences: Arc<dyn PreferenceStore> = match config.preferences_path() {
            Some(path) => Arc::new(FilePreferences::new(path)),
            None => Arc::new(MemoryPreferences::new()),
        };
        Self {
            db,
            cache: ListCache::new(*config.cache_ttl()),
            hub: NotificationHub::new(),
            preferences,
            config: Arc::new(config),
        }
    }

    /// Drops the cached lists a write made stale, then tells subscribers.
    pub async fn after_write(&self, path: WritePath, events: impl IntoIterator<Item = ChangeEvent>) {
        self.cache.invalidate(path).await;
        self.hub.publish_all(events);
    }

    #[cfg(test)]
    pub(crate) async fn for_tests() -> Self {
        Self::new(AppConfig::for_tests(), storage::memory_db().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_after_write_invalidates_and_notifies() -> AppResult<()> {
        let state = AppState::for_tests().await;
        let mut events = state.hub.subscribe();

        let _: Vec<i32> = state
            .cache
            .get_or_load(CacheKey::Inventory, || async { Ok(vec![1]) })
            .await?;

        state
            .after_write(
                WritePath::Inventory,
                [ChangeEvent::insert("inventory_items", &json!({ "id": 1 }))],
            )
            .await;

        assert!(!state.cache.contains(CacheKey::Inventory).await);
        match events.next().await {
            Some(Ok(event)) => assert_eq!(event.table, "inventory_items"),
            other => panic!("expected an event, got {other:?}"),
        }
        Ok(())
    }
}
