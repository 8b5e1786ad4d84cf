use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::preferences::{PreferenceStore, Update};

/// Preferences kept as one JSON object in a file.
pub struct FilePreferences {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("corrupt preferences file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, all: &BTreeMap<String, Value>) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(all)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for FilePreferences {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn save(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(key.to_string(), value);
        self.write_all(&all).await
    }

    async fn update(&self, key: &str, apply: Update<'_>) -> Result<Value> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        let value = apply(all.remove(key))?;
        all.insert(key.to_string(), value.clone());
        self.write_all(&all).await?;
        Ok(value)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.into_keys().collect())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        if all.remove(key).is_some() {
            self.write_all(&all).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_values_survive_reopen() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("prefs.json");

        let store = FilePreferences::new(&path);
        store.save("sidebar-open-sections", json!(["licenses"])).await?;
        store.save("theme", json!("dark")).await?;
        drop(store);

        let reopened = FilePreferences::new(&path);
        assert_eq!(
            reopened.load("sidebar-open-sections").await?,
            Some(json!(["licenses"]))
        );
        assert_eq!(reopened.load("theme").await?, Some(json!("dark")));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = FilePreferences::new(dir.path().join("absent.json"));
        assert!(store.load("anything").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_persists() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("prefs.json");
        let store = FilePreferences::new(&path);
        store.save("a", json!(1)).await?;
        store.update("b", Box::new(|_| Ok(json!(2)))).await?;
        store.remove("a").await?;

        let reopened = FilePreferences::new(&path);
        assert_eq!(reopened.keys().await?, vec!["b".to_string()]);
        Ok(())
    }
}
