//! Document loading and normalization.
//!
//! Turns uploaded bytes plus a declared type tag (`pdf`, `json`, `txt`) into
//! ordered [`Document`] records. Everything happens in memory; no temporary
//! files are written.
//!
//! | Tag | Records | `metadata.type` |
//! |-----|---------|-----------------|
//! | `pdf` | one per page, `page` is zero-based | `PDF` |
//! | `json` | one, compact re-serialization | `JSON` |
//! | `txt` | one | `EMAIL` or `TEXT` |
//!
//! Text is decoded as UTF-8 first and falls back to Latin-1.

use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

use doc_intake_core::models::Document;

/// `From:` at the very start of the text, then a later line holding `Subject:`.
static EMAIL_HEADERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^From:.*?\n.*Subject:.*\n").expect("invalid email header regex")
});

/// Loader failure taxonomy (input errors, surfaced to the caller).
#[derive(Debug)]
pub enum LoadError {
    UnsupportedType(String),
    InvalidJson(String),
    Pdf(String),
    Empty(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::UnsupportedType(t) => write!(f, "Unsupported file type: {}", t),
            LoadError::InvalidJson(e) => write!(f, "Invalid JSON format: {}", e),
            LoadError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            LoadError::Empty(name) => write!(f, "No content could be extracted from {}", name),
        }
    }
}

impl std::error::Error for LoadError {}

/// Load a document from raw bytes.
///
/// Returns a non-empty list of records or a [`LoadError`].
pub fn load_document(
    bytes: &[u8],
    file_type: &str,
    file_name: &str,
) -> Result<Vec<Document>, LoadError> {
    let docs = match file_type.trim().to_ascii_lowercase().as_str() {
        "pdf" => load_pdf(bytes, file_name)?,
        "json" => vec![load_json(bytes, file_name)?],
        "txt" => vec![load_text(bytes, file_name)?],
        other => return Err(LoadError::UnsupportedType(other.to_string())),
    };

    if docs.is_empty() {
        return Err(LoadError::Empty(file_name.to_string()));
    }
    tracing::debug!(file_name, file_type, records = docs.len(), "document loaded");
    Ok(docs)
}

/// Map an upload's MIME type to a loader tag, falling back to the file extension.
pub fn file_type_for(mime: Option<&str>, file_name: &str) -> String {
    match mime.map(|m| m.split(';').next().unwrap_or(m).trim()) {
        Some("application/pdf") => "pdf".to_string(),
        Some("application/json") => "json".to_string(),
        Some("text/plain") => "txt".to_string(),
        _ => file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default(),
    }
}

/// Re-derive `type` from the record's `source` extension.
///
/// Extensions match case-sensitively. A `.txt` source is `EMAIL` only when
/// the content opens with `From:` and a `Subject:` line follows that ends in
/// a newline (both case-insensitive); otherwise `TEXT`.
pub fn infer_metadata(doc: &Document) -> Map<String, Value> {
    let mut metadata = doc.metadata.clone();
    let Some(source) = doc.meta_str("source") else {
        return metadata;
    };

    let kind = if source.ends_with(".pdf") {
        Some("PDF")
    } else if source.ends_with(".json") {
        Some("JSON")
    } else if source.ends_with(".txt") {
        Some(if EMAIL_HEADERS.is_match(&doc.page_content) {
            "EMAIL"
        } else {
            "TEXT"
        })
    } else {
        None
    };

    if let Some(kind) = kind {
        metadata.insert("type".to_string(), json!(kind));
    }
    metadata
}

fn load_pdf(bytes: &[u8], file_name: &str) -> Result<Vec<Document>, LoadError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| LoadError::Pdf(e.to_string()))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let mut doc = Document::new(text);
            doc.metadata.insert("source".to_string(), json!(file_name));
            doc.metadata.insert("page".to_string(), json!(i));
            doc.metadata.insert("type".to_string(), json!("PDF"));
            doc
        })
        .collect())
}

fn load_json(bytes: &[u8], file_name: &str) -> Result<Document, LoadError> {
    let text = decode_text(bytes);
    let value: Value =
        serde_json::from_str(&text).map_err(|e| LoadError::InvalidJson(e.to_string()))?;
    let content =
        serde_json::to_string(&value).map_err(|e| LoadError::InvalidJson(e.to_string()))?;

    let mut doc = Document::new(content);
    doc.metadata.insert("source".to_string(), json!(file_name));
    doc.metadata.insert("seq_num".to_string(), json!(1));
    doc.metadata.insert("type".to_string(), json!("JSON"));
    Ok(doc)
}

fn load_text(bytes: &[u8], file_name: &str) -> Result<Document, LoadError> {
    let text = decode_text(bytes);
    let is_email = text.contains('@') && (text.contains("Subject:") || text.contains("From:"));

    let mut doc = Document::new(text);
    doc.metadata.insert("source".to_string(), json!(file_name));

    if is_email {
        doc.metadata.insert("type".to_string(), json!("EMAIL"));
        let mut sender = None;
        let mut subject = None;
        for line in doc.page_content.lines() {
            if let Some(rest) = line.strip_prefix("From:") {
                sender = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("Subject:") {
                subject = Some(rest.trim().to_string());
            }
        }
        if let Some(s) = sender {
            doc.metadata.insert("sender".to_string(), json!(s));
        }
        if let Some(s) = subject {
            doc.metadata.insert("subject".to_string(), json!(s));
        }
    } else {
        doc.metadata.insert("type".to_string(), json!("TEXT"));
    }

    Ok(doc)
}

/// UTF-8, then Latin-1 (every byte maps to the code point of the same value).
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "content is not UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}
