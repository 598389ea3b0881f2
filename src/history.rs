//! Processing history and single-result lookup.
//!
//! Used by `intake history`, `intake result`, and the matching HTTP routes.

use anyhow::{bail, Result};

use doc_intake_core::models::ProcessingResult;

use crate::backend;
use crate::config::Config;

/// `intake history [--limit N]`: newest entries first.
pub async fn run_history(config: &Config, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(config.history.display_limit);
    let memory = backend::open_shared_memory(config).await?;
    let history = memory.get_recent_history(limit).await?;

    if history.is_empty() {
        println!("No documents processed yet.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<27}  {:<7}  {:<10}  SOURCE",
        "TASK ID", "TIMESTAMP", "FORMAT", "INTENT"
    );
    for entry in &history {
        println!(
            "{:<36}  {:<27}  {:<7}  {:<10}  {}",
            entry.task_id, entry.timestamp, entry.format_type, entry.intent, entry.source
        );
    }
    Ok(())
}

/// `intake result <task_id>`.
pub async fn run_result(config: &Config, task_id: &str) -> Result<()> {
    let memory = backend::open_shared_memory(config).await?;
    match memory.get_processing_result(task_id).await? {
        Some(result) => {
            print_result(&result)?;
            Ok(())
        }
        None => bail!("No result found for task: {}", task_id),
    }
}

fn print_result(result: &ProcessingResult) -> Result<()> {
    println!("--- Result ---");
    println!("task_id:    {}", result.task_id);
    println!("source:     {}", result.source);
    println!("format:     {}", result.format_type);
    println!("intent:     {}", result.intent);
    println!("timestamp:  {}", result.timestamp);
    println!("--- Extracted data ---");
    println!("{}", serde_json::to_string_pretty(&result.extracted_data)?);
    Ok(())
}
