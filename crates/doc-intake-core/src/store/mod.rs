//! Storage abstraction for doc-intake.
//!
//! The [`StorageBackend`] trait is a plain key → JSON value store. Backends
//! are interchangeable: the [`SharedMemory`](crate::shared::SharedMemory)
//! facade behaves identically whichever one it is given.
//!
//! Every backend persists values as JSON text and parses them back on
//! retrieval. There are no secondary indices and no multi-key transactions.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use memory::InMemoryBackend;

/// Abstract key/value backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`store`](StorageBackend::store) | Write a value, overwriting any previous one |
/// | [`retrieve`](StorageBackend::retrieve) | Read a value; `None` when absent |
/// | [`delete`](StorageBackend::delete) | Remove a key; no-op when absent |
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short label used in logs (`memory`, `sqlite`, `redis`).
    fn name(&self) -> &str;

    /// Persist `value` under `key`, replacing any prior content.
    async fn store(&self, key: &str, value: &Value) -> Result<()>;

    /// Return the stored value, or `None` if the key was never stored or
    /// has been deleted. A missing key is not an error.
    async fn retrieve(&self, key: &str) -> Result<Option<Value>>;

    /// Remove `key` if present.
    async fn delete(&self, key: &str) -> Result<()>;
}
