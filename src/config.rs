use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use derive_getters::Getters;

use crate::cache::DEFAULT_TTL;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, Getters)]
pub struct AppConfig {
    database_url: String,
    bind_addr: String,
    cache_ttl: Duration,
    preferences_path: Option<PathBuf>,
    bcrypt_cost: u32,
    cors_allow_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let cache_ttl = match var("CACHE_TTL_SECS") {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .with_context(|| format!("CACHE_TTL_SECS is not a number: {raw}"))?,
            ),
            None => DEFAULT_TTL,
        };

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("BCRYPT_COST is not a number: {raw}"))?,
            None => DEFAULT_BCRYPT_COST,
        };

        Ok(Self {
            database_url,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            cache_ttl,
            preferences_path: var("PREFERENCES_PATH").map(PathBuf::from),
            bcrypt_cost,
            cors_allow_origin: var("CORS_ALLOW_ORIGIN"),
        })
    }

    /// Configuration for tests: in-memory SQLite, short bcrypt cost.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            cache_ttl: DEFAULT_TTL,
            preferences_path: None,
            bcrypt_cost: 4,
            cors_allow_origin: None,
        }
    }
}
