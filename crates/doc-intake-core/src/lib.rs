//! # doc-intake core
//!
//! Runtime-agnostic logic for doc-intake: the data model, the persisted key
//! schema, the [`store::StorageBackend`] abstraction with its in-memory
//! variant, and the [`shared::SharedMemory`] facade that records processing
//! results and source metadata.
//!
//! This crate contains no tokio, sqlx, network, or filesystem dependencies.
//! Native backends (SQLite, Redis) live in the `doc-intake` crate.

pub mod keys;
pub mod models;
pub mod shared;
pub mod store;

pub use shared::SharedMemory;
pub use store::StorageBackend;
