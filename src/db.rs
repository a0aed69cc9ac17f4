use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::debug;

pub type DB = SqlitePool;

/// Opens (creating if needed) the database at `path` and brings its schema up to date.
pub async fn open(path: &str) -> Result<DB> {
    let opts = SqliteConnectOptions::from_str(path)
        .with_context(|| format!("Invalid database path: {}", path))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .with_context(|| format!("Failed to open database at {}", path))?;

    migrate(&pool).await?;
    debug!(path, "database ready");
    Ok(pool)
}

/// A private in-memory database. One connection, since each `:memory:` connection is its own database.
pub async fn open_in_memory() -> Result<DB> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &DB) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to apply database migrations")
}
