//! In-memory [`StorageBackend`] implementation.
//!
//! Values are kept as JSON text in a `HashMap` behind `std::sync::RwLock`,
//! so the in-memory variant round-trips through the same serialization as
//! the persistent backends. Nothing survives the process.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::StorageBackend;

/// Process-local backend; the default for [`SharedMemory`](crate::SharedMemory).
pub struct InMemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn store(&self, key: &str, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        entries.insert(key.to_string(), text);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        match entries.get(key) {
            Some(text) => Ok(Some(serde_json::from_str(text)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}
