//! The [`SharedMemory`] facade.
//!
//! Domain-named operations over a [`StorageBackend`]: source metadata,
//! extracted values and thread ids keyed by source id, processing results
//! keyed by task id, and a capped newest-first history list.
//!
//! # Consistency
//!
//! [`SharedMemory::store_processing_result`] performs two independent
//! backend writes (`result:<task_id>` then `history`) and the history update
//! is a read-modify-write. Two concurrent callers can interleave and lose an
//! entry. Callers that need stronger guarantees must serialize writes
//! themselves.
//!
//! # Deletion
//!
//! [`SharedMemory::delete_source_data`] only removes the `source:`,
//! `extracted:` and `thread:` keys. Processing results and history entries
//! for the same upload are left untouched.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::keys;
use crate::models::{format_timestamp, FormatType, Intent, ProcessingResult, SourceInfo};
use crate::store::{InMemoryBackend, StorageBackend};

/// Facade over an injected [`StorageBackend`].
#[derive(Clone)]
pub struct SharedMemory {
    backend: Arc<dyn StorageBackend>,
}

impl Default for SharedMemory {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SharedMemory {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Facade over a fresh [`InMemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    // ============ Source-scoped keys ============

    /// Record the source type, stamped with `timestamp` or now (UTC).
    pub async fn store_source_info(
        &self,
        source_id: &str,
        source_type: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let info = SourceInfo {
            source_type: source_type.to_string(),
            timestamp: format_timestamp(timestamp.unwrap_or_else(Utc::now)),
        };
        self.put(&keys::source(source_id), &info).await
    }

    /// Overwrite the extracted values for a source. No merge with prior content.
    pub async fn store_extracted_values<T>(&self, source_id: &str, values: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.put(&keys::extracted(source_id), values).await
    }

    pub async fn store_thread_id(&self, source_id: &str, thread_id: &str) -> Result<()> {
        self.put(&keys::thread(source_id), thread_id).await
    }

    pub async fn get_source_info(&self, source_id: &str) -> Result<Option<SourceInfo>> {
        self.get(&keys::source(source_id)).await
    }

    pub async fn get_extracted_values(&self, source_id: &str) -> Result<Option<Value>> {
        self.backend.retrieve(&keys::extracted(source_id)).await
    }

    pub async fn get_thread_id(&self, source_id: &str) -> Result<Option<String>> {
        self.get(&keys::thread(source_id)).await
    }

    /// Remove the `source:`, `extracted:` and `thread:` entries for a source.
    pub async fn delete_source_data(&self, source_id: &str) -> Result<()> {
        self.backend.delete(&keys::source(source_id)).await?;
        self.backend.delete(&keys::extracted(source_id)).await?;
        self.backend.delete(&keys::thread(source_id)).await?;
        debug!(source_id, backend = self.backend.name(), "deleted source data");
        Ok(())
    }

    // ============ Processing results ============

    /// Record a processed upload and prepend it to the capped history.
    ///
    /// Returns the stored record.
    pub async fn store_processing_result<T>(
        &self,
        task_id: &str,
        source: &str,
        format_type: FormatType,
        intent: Intent,
        extracted_data: &T,
    ) -> Result<ProcessingResult>
    where
        T: Serialize + ?Sized,
    {
        let result = ProcessingResult {
            task_id: task_id.to_string(),
            source: source.to_string(),
            format_type,
            intent,
            extracted_data: serde_json::to_value(extracted_data)
                .context("extracted data is not JSON-serializable")?,
            timestamp: format_timestamp(Utc::now()),
        };
        self.put(&keys::result(task_id), &result).await?;

        let mut history = self.get_recent_history(keys::HISTORY_CAP).await?;
        history.insert(0, result.clone());
        history.truncate(keys::HISTORY_CAP);
        self.put(keys::HISTORY, &history).await?;

        debug!(
            task_id,
            source,
            format = %format_type,
            intent = %intent,
            history_len = history.len(),
            "stored processing result"
        );
        Ok(result)
    }

    /// The first `limit` history entries, newest first.
    pub async fn get_recent_history(&self, limit: usize) -> Result<Vec<ProcessingResult>> {
        let mut history: Vec<ProcessingResult> =
            self.get(keys::HISTORY).await?.unwrap_or_default();
        history.truncate(limit);
        Ok(history)
    }

    pub async fn get_processing_result(&self, task_id: &str) -> Result<Option<ProcessingResult>> {
        self.get(&keys::result(task_id)).await
    }

    // ============ Helpers ============

    async fn put<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize value for key {}", key))?;
        self.backend.store(key, &value).await
    }

    async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.backend.retrieve(key).await? {
            Some(value) => {
                let parsed = serde_json::from_value(value)
                    .with_context(|| format!("unexpected value shape under key {}", key))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn invoice_result_appears_in_history() {
        let mem = SharedMemory::default();
        mem.store_processing_result(
            "t1",
            "invoice.pdf",
            FormatType::Pdf,
            Intent::Invoice,
            &json!({"total": 100}),
        )
        .await
        .unwrap();

        let history = mem.get_recent_history(1).await.unwrap();
        assert_eq!(history.len(), 1);
        let entry = &history[0];
        assert_eq!(entry.task_id, "t1");
        assert_eq!(entry.source, "invoice.pdf");
        assert_eq!(entry.format_type, FormatType::Pdf);
        assert_eq!(entry.intent, Intent::Invoice);
        assert_eq!(entry.extracted_data, json!({"total": 100}));

        let stored = mem.get_processing_result("t1").await.unwrap().unwrap();
        assert_eq!(&stored, entry);
    }

    #[tokio::test]
    async fn history_is_capped_newest_first() {
        let mem = SharedMemory::in_memory();
        for i in 0..105 {
            mem.store_processing_result(
                &format!("t{}", i),
                "doc.txt",
                FormatType::Text,
                Intent::Other,
                &json!({ "n": i }),
            )
            .await
            .unwrap();
        }

        let history = mem.get_recent_history(1000).await.unwrap();
        assert_eq!(history.len(), keys::HISTORY_CAP);
        let ids: Vec<String> = history.iter().map(|r| r.task_id.clone()).collect();
        let expected: Vec<String> = (5..105).rev().map(|i| format!("t{}", i)).collect();
        assert_eq!(ids, expected);

        assert_eq!(mem.get_recent_history(3).await.unwrap().len(), 3);
        assert_eq!(mem.get_recent_history(0).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn empty_history_is_empty() {
        let mem = SharedMemory::in_memory();
        assert!(mem.get_recent_history(5).await.unwrap().is_empty());
        assert!(mem.get_processing_result("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn source_info_uses_given_timestamp() {
        let mem = SharedMemory::in_memory();
        let ts = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        mem.store_source_info("s1", "email", Some(ts)).await.unwrap();
        let info = mem.get_source_info("s1").await.unwrap().unwrap();
        assert_eq!(info.source_type, "email");
        assert_eq!(info.timestamp, "2024-05-06T07:08:09.000000Z");
    }

    #[tokio::test]
    async fn source_info_defaults_timestamp_to_now() {
        let mem = SharedMemory::in_memory();
        let before = Utc::now();
        mem.store_source_info("s1", "pdf", None).await.unwrap();
        let info = mem.get_source_info("s1").await.unwrap().unwrap();
        let stamped = DateTime::parse_from_rfc3339(&info.timestamp)
            .unwrap()
            .with_timezone(&Utc);
        assert!(stamped >= before - chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn extracted_values_are_overwritten_not_merged() {
        let mem = SharedMemory::in_memory();
        mem.store_extracted_values("s1", &json!({"a": 1, "b": 2}))
            .await
            .unwrap();
        let mut second = HashMap::new();
        second.insert("c", 3);
        mem.store_extracted_values("s1", &second).await.unwrap();
        assert_eq!(
            mem.get_extracted_values("s1").await.unwrap(),
            Some(json!({"c": 3}))
        );
    }

    #[tokio::test]
    async fn delete_source_data_leaves_results_alone() {
        let mem = SharedMemory::in_memory();
        mem.store_source_info("s1", "pdf", None).await.unwrap();
        mem.store_extracted_values("s1", &json!({"x": 1})).await.unwrap();
        mem.store_thread_id("s1", "thread-42").await.unwrap();
        mem.store_processing_result("s1", "s1.pdf", FormatType::Pdf, Intent::Rfq, &json!({}))
            .await
            .unwrap();

        assert_eq!(
            mem.get_thread_id("s1").await.unwrap().as_deref(),
            Some("thread-42")
        );

        mem.delete_source_data("s1").await.unwrap();

        assert!(mem.get_source_info("s1").await.unwrap().is_none());
        assert!(mem.get_extracted_values("s1").await.unwrap().is_none());
        assert!(mem.get_thread_id("s1").await.unwrap().is_none());
        assert!(mem.get_processing_result("s1").await.unwrap().is_some());
        assert_eq!(mem.get_recent_history(10).await.unwrap().len(), 1);

        // Deleting again is a no-op.
        mem.delete_source_data("s1").await.unwrap();
    }

    #[tokio::test]
    async fn unserializable_extracted_data_propagates() {
        let mem = SharedMemory::in_memory();
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        let err = mem
            .store_processing_result("t1", "x.json", FormatType::Json, Intent::Other, &bad)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("JSON-serializable"));
        assert!(mem.get_recent_history(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn facade_is_backend_agnostic_over_clones() {
        let backend: Arc<dyn StorageBackend> = Arc::new(InMemoryBackend::new());
        let a = SharedMemory::new(backend.clone());
        let b = SharedMemory::new(backend);
        a.store_thread_id("s", "t").await.unwrap();
        assert_eq!(b.get_thread_id("s").await.unwrap().as_deref(), Some("t"));
        assert_eq!(a.backend().name(), "memory");
    }
}
