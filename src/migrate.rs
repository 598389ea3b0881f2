//! Database schema for the SQLite backend (idempotent).

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the key/value table if it does not exist.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS memory (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// `intake init`: prepare storage for the configured backend.
///
/// Only the SQLite backend has a schema; for the others this reports that
/// nothing needs doing.
pub async fn run_migrations(config: &Config) -> Result<()> {
    if config.storage.backend != "sqlite" {
        println!(
            "Storage backend '{}' needs no initialization.",
            config.storage.backend
        );
        return Ok(());
    }

    let pool = db::connect(&config.storage.sqlite_path).await?;
    ensure_schema(&pool).await?;
    pool.close().await;

    println!(
        "Database initialized successfully at {}.",
        config.storage.sqlite_path.display()
    );
    Ok(())
}
