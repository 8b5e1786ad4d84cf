//! Cache-aside for read-heavy list endpoints.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppResult;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cached list, one per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Inventory,
    Licenses,
    AssignedAssets,
    Activities,
    Histories,
    Accounts,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::Inventory => "inventory:list",
            CacheKey::Licenses => "licenses:list",
            CacheKey::AssignedAssets => "assigned-assets:list",
            CacheKey::Activities => "activities:list",
            CacheKey::Histories => "histories:list",
            CacheKey::Accounts => "accounts:list",
        }
    }
}

/// Write paths and the cached lists each one makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    Inventory,
    License,
    AssignedAsset,
    Activity,
    History,
    Account,
}

impl WritePath {
    pub fn invalidates(&self) -> &'static [CacheKey] {
        match self {
            WritePath::Inventory => &[CacheKey::Inventory],
            WritePath::License => &[CacheKey::Licenses],
            // assignments move inventory items to DEPLOYED
            WritePath::AssignedAsset => &[CacheKey::AssignedAssets, CacheKey::Inventory],
            WritePath::Activity => &[CacheKey::Activities],
            WritePath::History => &[CacheKey::Histories, CacheKey::Activities],
            WritePath::Account => &[CacheKey::Accounts],
        }
    }
}

/// Each key carries a generation that every invalidation bumps, so a load
/// that raced with a write never publishes its pre-write snapshot.
#[derive(Clone)]
pub struct ListCache {
    inner: Cache<&'static str, serde_json::Value>,
    generations: Arc<DashMap<CacheKey, u64>>,
}

impl ListCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(64).time_to_live(ttl).build(),
            generations: Arc::new(DashMap::new()),
        }
    }

    fn generation(&self, key: CacheKey) -> u64 {
        self.generations.get(&key).map_or(0, |g| *g)
    }

    /// Returns the cached list for `key`, or runs `load` and caches its result.
    pub async fn get_or_load<T, F, Fut>(&self, key: CacheKey, load: F) -> AppResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Vec<T>>>,
    {
        if let Some(cached) = self.inner.get(key.as_str()).await {
            tracing::debug!(key = key.as_str(), "list cache hit");
            return Ok(serde_json::from_value(cached)?);
        }

        let generation = self.generation(key);
        let rows = load().await?;
        if self.generation(key) != generation {
            tracing::debug!(key = key.as_str(), "list invalidated during load, not caching");
            return Ok(rows);
        }

        self.inner
            .insert(key.as_str(), serde_json::to_value(&rows)?)
            .await;
        // an invalidation may have landed between the check and the insert
        if self.generation(key) != generation {
            self.inner.invalidate(key.as_str()).await;
        }
        Ok(rows)
    }

    pub async fn invalidate(&self, path: WritePath) {
        for key in path.invalidates() {
            *self.generations.entry(*key).or_insert(0) += 1;
            self.inner.invalidate(key.as_str()).await;
        }
    }

    pub async fn contains(&self, key: CacheKey) -> bool {
        self.inner.get(key.as_str()).await.is_some()
    }
}

impl Default for ListCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
