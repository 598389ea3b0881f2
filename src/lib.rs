//! # doc-intake
//!
//! Classify uploaded documents with an LLM, extract structured data from
//! them, and keep a queryable processing history.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐   ┌────────────────┐
//! │   Upload    │──▶│   Loader    │──▶│    Agent     │──▶│  SharedMemory  │
//! │ pdf/json/txt│   │  Documents  │   │ classify +   │   │ memory/sqlite/ │
//! └─────────────┘   └─────────────┘   │ extract (LLM)│   │ redis          │
//!                                     └──────────────┘   └───────┬────────┘
//!                                                                │
//!                                          ┌─────────────────────┤
//!                                          ▼                     ▼
//!                                     ┌──────────┐         ┌──────────┐
//!                                     │   CLI    │         │   HTTP   │
//!                                     │ (intake) │         │   API    │
//!                                     └──────────┘         └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! intake init                          # create the SQLite table
//! intake process ./invoice.pdf         # classify, extract, record
//! intake history --limit 10            # newest results first
//! intake serve                         # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | SQLite schema |
//! | [`sqlite_store`] | SQLite storage backend |
//! | [`redis_store`] | Redis storage backend |
//! | [`backend`] | Backend selection from config |
//! | [`loader`] | Bytes to document records |
//! | [`llm`] | LLM provider clients |
//! | [`agent`] | Classification and extraction |
//! | [`process`] | Upload pipeline |
//! | [`history`] | History and result lookup |
//! | [`sources`] | Source-scoped records |
//! | [`server`] | HTTP API |
//!
//! Data model, key schema, the storage trait and the [`SharedMemory`] facade
//! live in [`doc_intake_core`] and are re-exported here.

pub mod agent;
pub mod backend;
pub mod config;
pub mod db;
pub mod history;
pub mod llm;
pub mod loader;
pub mod migrate;
pub mod process;
pub mod redis_store;
pub mod server;
pub mod sources;
pub mod sqlite_store;

pub use doc_intake_core::{keys, models, store, SharedMemory, StorageBackend};
