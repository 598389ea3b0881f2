//! Source-scoped records: source info, extracted values and thread id.
//!
//! These keys live independently of processing results. Deleting a source
//! does not touch `result:*` or the history list.

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::Value;

use doc_intake_core::models::SourceInfo;
use doc_intake_core::SharedMemory;

use crate::backend;
use crate::config::Config;

/// Everything stored for one source id.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRecord {
    pub source_id: String,
    pub info: Option<SourceInfo>,
    pub extracted: Option<Value>,
    pub thread_id: Option<String>,
}

impl SourceRecord {
    pub fn is_empty(&self) -> bool {
        self.info.is_none() && self.extracted.is_none() && self.thread_id.is_none()
    }
}

/// Gather the three source-scoped entries.
pub async fn get_source(memory: &SharedMemory, source_id: &str) -> Result<SourceRecord> {
    Ok(SourceRecord {
        source_id: source_id.to_string(),
        info: memory.get_source_info(source_id).await?,
        extracted: memory.get_extracted_values(source_id).await?,
        thread_id: memory.get_thread_id(source_id).await?,
    })
}

/// `intake source show <id>`.
pub async fn run_show(config: &Config, source_id: &str) -> Result<()> {
    let memory = backend::open_shared_memory(config).await?;
    let record = get_source(&memory, source_id).await?;
    if record.is_empty() {
        bail!("No data stored for source: {}", source_id);
    }

    println!("--- Source ---");
    println!("id:         {}", record.source_id);
    match &record.info {
        Some(info) => {
            println!("type:       {}", info.source_type);
            println!("timestamp:  {}", info.timestamp);
        }
        None => println!("type:       (none)"),
    }
    println!(
        "thread:     {}",
        record.thread_id.as_deref().unwrap_or("(none)")
    );
    if let Some(extracted) = &record.extracted {
        println!("--- Extracted values ---");
        println!("{}", serde_json::to_string_pretty(extracted)?);
    }
    Ok(())
}

/// `intake source set <id> --type <t> [--thread <tid>]`.
pub async fn run_set(
    config: &Config,
    source_id: &str,
    source_type: &str,
    thread_id: Option<&str>,
) -> Result<()> {
    let memory = backend::open_shared_memory(config).await?;
    memory.store_source_info(source_id, source_type, None).await?;
    if let Some(thread_id) = thread_id {
        memory.store_thread_id(source_id, thread_id).await?;
    }
    println!("Recorded source {} ({}).", source_id, source_type);
    Ok(())
}

/// `intake source delete <id>`.
pub async fn run_delete(config: &Config, source_id: &str) -> Result<()> {
    let memory = backend::open_shared_memory(config).await?;
    memory.delete_source_data(source_id).await?;
    println!("Deleted source data for {}.", source_id);
    Ok(())
}
