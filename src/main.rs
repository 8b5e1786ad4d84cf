use anyhow::{Context, Result};
use asset_desk::config::AppConfig;
use asset_desk::{router, storage, AppState};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env is fine; the variables may come from the environment
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let db = storage::connect(config.database_url())
        .await
        .context("connecting to the database")?;
    let bind_addr = config.bind_addr().clone();
    let state = AppState::new(config, db);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "asset desk listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
