//! Core data models shared by the loader, the agent, and the persistence layer.
//!
//! Everything here serializes to the JSON shape stored in the backends, so the
//! field names are part of the persisted layout.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Detected document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormatType {
    Pdf,
    Json,
    Email,
    Text,
    Unknown,
}

impl FormatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatType::Pdf => "PDF",
            FormatType::Json => "JSON",
            FormatType::Email => "EMAIL",
            FormatType::Text => "TEXT",
            FormatType::Unknown => "UNKNOWN",
        }
    }

    /// Lenient parse used on model output: unrecognized labels become `Unknown`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(FormatType::Unknown)
    }
}

impl FromStr for FormatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PDF" => Ok(FormatType::Pdf),
            "JSON" => Ok(FormatType::Json),
            "EMAIL" => Ok(FormatType::Email),
            "TEXT" => Ok(FormatType::Text),
            "UNKNOWN" => Ok(FormatType::Unknown),
            other => Err(format!("unknown format: {}", other)),
        }
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business intent assigned to a document by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Invoice,
    Rfq,
    Complaint,
    Regulation,
    Other,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Invoice => "INVOICE",
            Intent::Rfq => "RFQ",
            Intent::Complaint => "COMPLAINT",
            Intent::Regulation => "REGULATION",
            Intent::Other => "OTHER",
            Intent::Unknown => "UNKNOWN",
        }
    }

    /// Lenient parse used on model output: unrecognized labels become `Other`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Intent::Other)
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INVOICE" => Ok(Intent::Invoice),
            "RFQ" => Ok(Intent::Rfq),
            "COMPLAINT" => Ok(Intent::Complaint),
            "REGULATION" => Ok(Intent::Regulation),
            "OTHER" => Ok(Intent::Other),
            "UNKNOWN" => Ok(Intent::Unknown),
            other => Err(format!("unknown intent: {}", other)),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One processed upload, as stored under `result:<task_id>` and in `history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub task_id: String,
    /// Original filename of the upload.
    pub source: String,
    pub format_type: FormatType,
    pub intent: Intent,
    pub extracted_data: serde_json::Value,
    /// ISO-8601 UTC timestamp.
    pub timestamp: String,
}

/// Source metadata stored under `source:<source_id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub source_type: String,
    pub timestamp: String,
}

/// A normalized document record produced by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// String-valued metadata lookup.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Output of the classification/extraction agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub format: FormatType,
    pub intent: Intent,
    pub confidence: f64,
    pub analysis: serde_json::Value,
}

impl AgentResult {
    /// The sentinel returned when classification or extraction fails.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            format: FormatType::Unknown,
            intent: Intent::Unknown,
            confidence: 0.0,
            analysis: serde_json::json!({ "error": message.into() }),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.format == FormatType::Unknown
            && self.intent == Intent::Unknown
            && self.analysis.get("error").is_some()
    }
}

/// Format a UTC instant the way every stored timestamp is written.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
