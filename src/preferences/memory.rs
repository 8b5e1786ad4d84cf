use crate::preferences::{PreferenceStore, Update};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

#[derive(Clone, Default)]
pub struct MemoryPreferences {
    values: DashMap<String, Value>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).map(|v| v.clone()))
    }

    async fn save(&self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn update(&self, key: &str, apply: Update<'_>) -> Result<Value> {
        // the entry holds its shard lock until the new value is in place
        match self.values.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let value = apply(Some(entry.get().clone()))?;
                entry.insert(value.clone());
                Ok(value)
            }
            Entry::Vacant(entry) => {
                let value = apply(None)?;
                entry.insert(value.clone());
                Ok(value)
            }
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.values.iter().map(|e| e.key().clone()).collect())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let store = MemoryPreferences::new();
        store.save("sidebar-open-sections", json!(["inventory"])).await?;
        let value = store.load("sidebar-open-sections").await?;
        assert_eq!(value, Some(json!(["inventory"])));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_key() -> Result<()> {
        let store = MemoryPreferences::new();
        assert!(store.load("nope").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_overwrites() -> Result<()> {
        let store = MemoryPreferences::new();
        store.save("k", json!(1)).await?;
        store.save("k", json!(2)).await?;
        assert_eq!(store.load("k").await?, Some(json!(2)));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_sees_current_value() -> Result<()> {
        let store = MemoryPreferences::new();
        let first = store.update("n", Box::new(|v| Ok(json!(v.is_some())))).await?;
        assert_eq!(first, json!(false));
        let second = store.update("n", Box::new(|v| Ok(json!(v.is_some())))).await?;
        assert_eq!(second, json!(true));

        store.remove("n").await?;
        assert!(store.keys().await?.is_empty());
        Ok(())
    }
}
