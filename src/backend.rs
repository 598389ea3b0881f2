//! Backend selection.
//!
//! Use [`create_backend`] to instantiate the [`StorageBackend`] named by
//! `[storage].backend`:
//!
//! | Name | Backend | Settings |
//! |------|---------|----------|
//! | `memory` | [`InMemoryBackend`] | none; contents die with the process |
//! | `sqlite` (default) | [`SqliteBackend`] | `sqlite_path` |
//! | `redis` | [`RedisBackend`] | `redis_url` |

use anyhow::{bail, Result};
use std::sync::Arc;

use doc_intake_core::store::{InMemoryBackend, StorageBackend};
use doc_intake_core::SharedMemory;

use crate::config::{Config, StorageConfig};
use crate::redis_store::RedisBackend;
use crate::sqlite_store::SqliteBackend;

pub async fn create_backend(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match config.backend.as_str() {
        "memory" => Arc::new(InMemoryBackend::new()),
        "sqlite" => Arc::new(SqliteBackend::open(&config.sqlite_path).await?),
        "redis" => Arc::new(RedisBackend::connect(&config.redis_url).await?),
        other => bail!("Unknown storage backend: {}", other),
    };
    tracing::info!(backend = backend.name(), "storage backend selected");
    Ok(backend)
}

/// Build a [`SharedMemory`] over the configured backend.
pub async fn open_shared_memory(config: &Config) -> Result<SharedMemory> {
    Ok(SharedMemory::new(create_backend(&config.storage).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn selects_memory() {
        let config = StorageConfig {
            backend: "memory".to_string(),
            ..StorageConfig::default()
        };
        let backend = create_backend(&config).await.unwrap();
        assert_eq!(backend.name(), "memory");
    }

    #[tokio::test]
    async fn selects_sqlite() {
        let tmp = TempDir::new().unwrap();
        let config = StorageConfig {
            backend: "sqlite".to_string(),
            sqlite_path: tmp.path().join("intake.sqlite"),
            ..StorageConfig::default()
        };
        let backend = create_backend(&config).await.unwrap();
        assert_eq!(backend.name(), "sqlite");
        assert!(tmp.path().join("intake.sqlite").exists());
    }

    #[tokio::test]
    async fn rejects_unknown() {
        let config = StorageConfig {
            backend: "etcd".to_string(),
            ..StorageConfig::default()
        };
        assert!(create_backend(&config).await.is_err());
    }
}
