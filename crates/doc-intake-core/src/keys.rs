//! Persisted key schema.
//!
//! Every backend sees the same flat string keys:
//!
//! | Key | Value |
//! |-----|-------|
//! | `source:<id>` | [`SourceInfo`](crate::models::SourceInfo) |
//! | `extracted:<id>` | arbitrary JSON |
//! | `thread:<id>` | JSON string |
//! | `result:<task_id>` | [`ProcessingResult`](crate::models::ProcessingResult) |
//! | `history` | array of `ProcessingResult`, newest first |

/// Key holding the capped result history.
pub const HISTORY: &str = "history";

/// Maximum number of entries kept in [`HISTORY`].
pub const HISTORY_CAP: usize = 100;

pub fn source(source_id: &str) -> String {
    format!("source:{}", source_id)
}

pub fn extracted(source_id: &str) -> String {
    format!("extracted:{}", source_id)
}

pub fn thread(source_id: &str) -> String {
    format!("thread:{}", source_id)
}

pub fn result(task_id: &str) -> String {
    format!("result:{}", task_id)
}
