//! SQLite-backed [`StorageBackend`] implementation.
//!
//! A single `memory(key, value)` table; values are JSON text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::Path;

use doc_intake_core::store::StorageBackend;

use crate::db;
use crate::migrate;

/// SQLite implementation of the [`StorageBackend`] trait.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `path` and ensure the table exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path)
            .await
            .with_context(|| format!("Failed to open SQLite database: {}", path.display()))?;
        migrate::ensure_schema(&pool).await?;
        tracing::debug!(path = %path.display(), "sqlite backend ready");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn store(&self, key: &str, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        sqlx::query(
            r#"
            INSERT INTO memory (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(&text)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Value>> {
        let text: Option<String> = sqlx::query_scalar("SELECT value FROM memory WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match text {
            Some(t) => Ok(Some(serde_json::from_str(&t).with_context(|| {
                format!("stored value for key {} is not valid JSON", key)
            })?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM memory WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
