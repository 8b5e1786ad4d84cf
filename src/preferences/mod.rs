//! Per-user UI preferences behind an injected key-value store.

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

pub mod file;
pub mod memory;

pub const SIDEBAR_SECTIONS_KEY: &str = "sidebar-open-sections";
const DISMISSED_REMINDERS_PREFIX: &str = "dismissed-reminders";

/// Computes a key's new value from its current one.
pub type Update<'a> = Box<dyn FnOnce(Option<Value>) -> Result<Value> + Send + 'a>;

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Value>>;
    async fn save(&self, key: &str, value: Value) -> Result<()>;

    /// Read-modify-write of one key. No other write to the store lands
    /// between the read and the write. Returns the stored value.
    async fn update(&self, key: &str, apply: Update<'_>) -> Result<Value>;

    async fn keys(&self) -> Result<Vec<String>>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Dismissals are stored per day, so yesterday's dismissals do not hide
/// today's reminders.
pub fn dismissed_reminders_key(day: NaiveDate) -> String {
    format!("{DISMISSED_REMINDERS_PREFIX}:{}", day.format("%Y-%m-%d"))
}

pub async fn dismissed_reminders(
    store: &dyn PreferenceStore,
    day: NaiveDate,
) -> Result<BTreeSet<String>> {
    let stored = store.load(&dismissed_reminders_key(day)).await?;
    Ok(match stored {
        Some(value) => serde_json::from_value(value)?,
        None => BTreeSet::new(),
    })
}

pub async fn dismiss_reminder(
    store: &dyn PreferenceStore,
    day: NaiveDate,
    reminder_id: &str,
) -> Result<BTreeSet<String>> {
    let key = dismissed_reminders_key(day);
    let stored = store
        .update(
            &key,
            Box::new(move |current| {
                let mut dismissed: BTreeSet<String> = match current {
                    Some(value) => serde_json::from_value(value)?,
                    None => BTreeSet::new(),
                };
                dismissed.insert(reminder_id.to_string());
                Ok(serde_json::to_value(dismissed)?)
            }),
        )
        .await?;
    let dismissed: BTreeSet<String> = serde_json::from_value(stored)?;

    // first dismissal of the day: earlier days can never be read again
    if dismissed.len() == 1 {
        prune_dismissals(store, &key).await?;
    }
    Ok(dismissed)
}

async fn prune_dismissals(store: &dyn PreferenceStore, keep: &str) -> Result<()> {
    let prefix = format!("{DISMISSED_REMINDERS_PREFIX}:");
    for key in store.keys().await? {
        if key.starts_with(&prefix) && key != keep {
            store.remove(&key).await?;
            tracing::debug!(key = %key, "pruned old reminder dismissals");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::file::FilePreferences;
    use super::memory::MemoryPreferences;
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_key_is_per_day() {
        assert_eq!(dismissed_reminders_key(day(15)), "dismissed-reminders:2026-10-15");
    }

    #[tokio::test]
    async fn test_dismissals_reset_the_next_day() -> Result<()> {
        let store = MemoryPreferences::new();

        dismiss_reminder(&store, day(15), "meeting-1").await?;
        dismiss_reminder(&store, day(15), "meeting-2").await?;
        dismiss_reminder(&store, day(15), "meeting-1").await?;

        let today = dismissed_reminders(&store, day(15)).await?;
        assert_eq!(today.len(), 2);
        assert!(today.contains("meeting-1"));

        let tomorrow = dismissed_reminders(&store, day(16)).await?;
        assert!(tomorrow.is_empty());
        Ok(())
    }

    async fn dismiss_concurrently(store: Arc<dyn PreferenceStore>) -> Result<()> {
        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    dismiss_reminder(store.as_ref(), day(15), &format!("meeting-{i}")).await
                })
            })
            .collect();
        for task in tasks {
            task.await??;
        }

        let dismissed = dismissed_reminders(store.as_ref(), day(15)).await?;
        assert_eq!(dismissed.len(), 20);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dismissals_are_all_kept() -> Result<()> {
        dismiss_concurrently(Arc::new(MemoryPreferences::new())).await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dismissals_are_all_kept_on_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        dismiss_concurrently(Arc::new(FilePreferences::new(dir.path().join("prefs.json")))).await
    }

    #[tokio::test]
    async fn test_earlier_days_are_pruned() -> Result<()> {
        let store = MemoryPreferences::new();
        store.save(SIDEBAR_SECTIONS_KEY, serde_json::json!(["inventory"])).await?;

        dismiss_reminder(&store, day(14), "meeting-1").await?;
        dismiss_reminder(&store, day(15), "meeting-1").await?;
        dismiss_reminder(&store, day(15), "meeting-2").await?;

        let mut keys = store.keys().await?;
        keys.sort();
        assert_eq!(keys, vec!["dismissed-reminders:2026-10-15", SIDEBAR_SECTIONS_KEY]);
        assert_eq!(dismissed_reminders(&store, day(15)).await?.len(), 2);
        Ok(())
    }
}
