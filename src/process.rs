//! Upload processing pipeline: load → classify/extract → persist.
//!
//! Shared by `intake process` and `POST /documents`. A loader failure is
//! returned as a [`LoadError`](crate::loader::LoadError) inside the
//! `anyhow::Error` so callers can tell bad input from infrastructure
//! failures with `downcast_ref`. Agent failures are not errors here: the
//! failure sentinel is stored and returned like any other result.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use doc_intake_core::models::AgentResult;
use doc_intake_core::SharedMemory;

use crate::agent::DocumentAgent;
use crate::backend;
use crate::config::Config;
use crate::llm;
use crate::loader;

/// What one processed upload produced.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub task_id: String,
    pub source: String,
    /// Number of records the loader produced; only the first is analyzed.
    pub records: usize,
    /// Metadata of the analyzed record with `type` re-derived from its source.
    pub metadata: Map<String, Value>,
    pub result: AgentResult,
}

/// Load `bytes`, run the agent on the first record, and store the result.
pub async fn process_upload(
    memory: &SharedMemory,
    agent: &DocumentAgent,
    bytes: &[u8],
    file_type: &str,
    file_name: &str,
) -> Result<ProcessOutcome> {
    let docs = loader::load_document(bytes, file_type, file_name)?;
    let records = docs.len();
    let doc = &docs[0];
    let metadata = loader::infer_metadata(doc);

    let result = agent.process_document(doc).await;

    let task_id = uuid::Uuid::new_v4().to_string();
    memory
        .store_processing_result(
            &task_id,
            file_name,
            result.format,
            result.intent,
            &result.analysis,
        )
        .await
        .context("Failed to store processing result")?;

    tracing::info!(
        task_id = %task_id,
        source = file_name,
        format = %result.format,
        intent = %result.intent,
        failed = result.is_failure(),
        "document processed"
    );

    Ok(ProcessOutcome {
        task_id,
        source: file_name.to_string(),
        records,
        metadata,
        result,
    })
}

/// `intake process <file> [--type ...]`.
pub async fn run_process(config: &Config, path: &Path, file_type: Option<&str>) -> Result<()> {
    let agent = DocumentAgent::new(llm::create_provider(&config.llm)?);
    let memory = backend::open_shared_memory(config).await?;

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file_type = match file_type {
        Some(t) => t.to_ascii_lowercase(),
        None => loader::file_type_for(None, &file_name),
    };

    let outcome = process_upload(&memory, &agent, &bytes, &file_type, &file_name).await?;

    println!("{}", serde_json::to_string_pretty(&outcome.result)?);
    println!("task_id: {}", outcome.task_id);
    if let Some(kind) = outcome.metadata.get("type").and_then(Value::as_str) {
        println!("document type: {}", kind);
    }
    if outcome.records > 1 {
        println!(
            "note: {} records loaded, only the first was analyzed",
            outcome.records
        );
    }
    if outcome.result.is_failure() {
        eprintln!("Warning: processing failed; the error was recorded in history.");
    }

    Ok(())
}
