//! Classification and extraction agent.
//!
//! [`DocumentAgent::process_document`] makes two model calls per document:
//!
//! 1. **Classify**: ask for `{format, intent, confidence}`.
//! 2. **Extract**: route on the classified format to a format-specific prompt
//!    and keep the returned object as `analysis`.
//!
//! | Format | Analysis shape |
//! |--------|----------------|
//! | `JSON` | `missing_fields`, `anomalies`, `suggested_schema` |
//! | `EMAIL` | `sender`, `recipient`, `subject`, `urgency`, `key_points`, `action_items`, `sentiment` |
//! | `TEXT` | `summary`, `key_topics`, `sentiment`, `action_items` |
//! | `PDF` | `title`, `summary`, `key_points`, `metadata`, `entities` |
//!
//! The agent never returns an error. Transport, parse and missing-field
//! failures collapse into [`AgentResult::failed`].

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use doc_intake_core::models::{AgentResult, Document, FormatType, Intent};

use crate::llm::LlmProvider;

const REPLY_RULE: &str =
    "Reply with the JSON object only. No prose, no explanation. Use null or [] for anything not present.";

pub struct DocumentAgent {
    provider: Arc<dyn LlmProvider>,
}

/// Parsed classifier reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Upper-cased label as returned by the model.
    pub format: String,
    pub intent: Intent,
    pub confidence: f64,
}

impl DocumentAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Classify and extract one document.
    pub async fn process_document(&self, doc: &Document) -> AgentResult {
        match self.try_process(doc).await {
            Ok(result) => result,
            Err(e) => {
                let message = format!("{:#}", e);
                error!(error = %message, provider = self.provider.name(), "document processing failed");
                AgentResult::failed(message)
            }
        }
    }

    async fn try_process(&self, doc: &Document) -> Result<AgentResult> {
        let classification = self.classify(&doc.page_content).await?;
        info!(
            format = %classification.format,
            intent = %classification.intent,
            confidence = classification.confidence,
            "document classified"
        );

        let format = match classification.format.parse::<FormatType>() {
            Ok(f) if f != FormatType::Unknown => f,
            _ => {
                warn!(format = %classification.format, "unsupported format");
                return Ok(AgentResult {
                    format: FormatType::Unknown,
                    intent: classification.intent,
                    confidence: classification.confidence,
                    analysis: json!({
                        "error": format!("Unsupported format: {}", classification.format)
                    }),
                });
            }
        };

        let prompt = extraction_prompt(format, &doc.page_content);
        let reply = self
            .provider
            .complete(&prompt)
            .await
            .with_context(|| format!("{} extraction call failed", format))?;
        let analysis = parse_json_response(&reply)?;

        Ok(AgentResult {
            format,
            intent: classification.intent,
            confidence: classification.confidence,
            analysis,
        })
    }

    async fn classify(&self, content: &str) -> Result<Classification> {
        let reply = self
            .provider
            .complete(&classifier_prompt(content))
            .await
            .context("classification call failed")?;
        let value = parse_json_response(&reply)?;
        parse_classification(&value)
    }
}

/// Pull `{format, intent, confidence}` out of the classifier reply.
pub fn parse_classification(value: &Value) -> Result<Classification> {
    let format = value
        .get("format")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("classification is missing 'format'"))?;
    let intent = value
        .get("intent")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("classification is missing 'intent'"))?;
    let confidence = match value.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .with_context(|| format!("confidence is not a number: {}", s))?,
        _ => bail!("classification is missing 'confidence'"),
    };

    Ok(Classification {
        format: format.trim().to_ascii_uppercase(),
        intent: Intent::parse_lenient(intent),
        confidence,
    })
}

/// Parse a model reply as JSON, unwrapping a fenced code block if present.
///
/// A ```` ```json ```` block wins; otherwise the first fenced block of any
/// language; otherwise the whole reply.
pub fn parse_json_response(reply: &str) -> Result<Value> {
    let body = fenced_block(reply).unwrap_or(reply).trim();
    serde_json::from_str(body).map_err(|e| {
        error!(error = %e, raw = reply, "model reply is not valid JSON");
        anyhow!("Failed to parse JSON response: {}", e)
    })
}

fn fenced_block(reply: &str) -> Option<&str> {
    if let Some(start) = reply.find("```json") {
        let rest = &reply[start + "```json".len()..];
        return rest.find("```").map(|end| &rest[..end]);
    }
    let start = reply.find("```")?;
    let rest = &reply[start + 3..];
    // Skip an optional language tag on the opening fence line.
    let rest = match rest.find('\n') {
        Some(nl) if !rest[..nl].contains('{') && !rest[..nl].contains('[') => &rest[nl + 1..],
        _ => rest,
    };
    rest.find("```").map(|end| &rest[..end])
}

fn classifier_prompt(content: &str) -> String {
    format!(
        "Classify the document below.\n\
         Return a JSON object with:\n\
         - \"format\": one of PDF, JSON, EMAIL, TEXT\n\
         - \"intent\": one of INVOICE, RFQ, COMPLAINT, REGULATION, OTHER\n\
         - \"confidence\": a number between 0.0 and 1.0\n\n\
         Document:\n{}\n\n{}",
        content, REPLY_RULE
    )
}

fn extraction_prompt(format: FormatType, content: &str) -> String {
    let (task, shape) = match format {
        FormatType::Json => (
            "Review this JSON payload for missing or anomalous fields.",
            r#"{"missing_fields": [string], "anomalies": [string], "suggested_schema": {"<field>": "<type>"}}"#,
        ),
        FormatType::Email => (
            "Extract the key information from this email.",
            r#"{"sender": string, "recipient": string, "subject": string, "urgency": "HIGH" | "MEDIUM" | "LOW", "key_points": [string], "action_items": [string], "sentiment": "POSITIVE" | "NEUTRAL" | "NEGATIVE"}"#,
        ),
        FormatType::Text => (
            "Summarize this text and pull out its main points.",
            r#"{"summary": string, "key_topics": [string], "sentiment": "POSITIVE" | "NEUTRAL" | "NEGATIVE", "action_items": [string]}"#,
        ),
        FormatType::Pdf | FormatType::Unknown => (
            "Extract structured information from this PDF text.",
            r#"{"title": string, "summary": string, "key_points": [string], "metadata": {"page_count": string, "creation_date": string, "author": string}, "entities": {"organizations": [string], "people": [string], "dates": [string], "amounts": [string]}}"#,
        ),
    };
    format!(
        "{}\nReturn a JSON object shaped like:\n{}\n\nContent:\n{}\n\n{}",
        task, shape, content, REPLY_RULE
    )
}
