//! Redis-backed [`StorageBackend`] implementation.
//!
//! `SET` / `GET` / `DEL` of JSON text over a managed, auto-reconnecting
//! async connection.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;

use doc_intake_core::store::StorageBackend;

/// Redis implementation of the [`StorageBackend`] trait.
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connect to the server at `url` (e.g. `redis://localhost:6379`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self> {
        let client =
            redis::Client::open(url).with_context(|| format!("Invalid Redis URL: {}", url))?;
        let conn = ConnectionManager::new(client)
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", url))?;
        tracing::debug!(url, "redis backend ready");
        Ok(Self { conn })
    }
}

#[async_trait]
impl StorageBackend for RedisBackend {
    fn name(&self) -> &str {
        "redis"
    }

    async fn store(&self, key: &str, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, text).await?;
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.conn.clone();
        let text: Option<String> = conn.get(key).await?;
        match text {
            Some(t) => Ok(Some(serde_json::from_str(&t).with_context(|| {
                format!("stored value for key {} is not valid JSON", key)
            })?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
