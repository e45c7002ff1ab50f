//! Classification and prioritization oracle boundary.
//!
//! Oracles are opaque request/response services that answer in free text
//! carrying a JSON payload, possibly wrapped in a fenced code block. This
//! module defines the traits, the request types, and tolerant payload
//! extraction. The core never trusts oracle output beyond what these
//! parsers accept.

use crate::{Result, error::AppSurveyorError, models::ExposureCandidate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod http;
pub mod prompt;

pub use http::ChatOracle;

/// Example values for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSamples {
    pub name: String,
    pub examples: Vec<String>,
}

/// Everything the classification oracle sees for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub table_id: String,
    pub display_name: String,
    pub columns: Vec<ColumnSamples>,
}

impl ClassificationRequest {
    /// Names of the requested columns.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Labels columns of one table.
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    /// Returns the oracle's raw answer, expected to carry a
    /// `{"fields": [{"name", "sensitivity"}]}` payload.
    async fn classify_columns(&self, request: &ClassificationRequest) -> Result<String>;
}

/// Ranks exposure candidates across tables.
#[async_trait]
pub trait PrioritizationOracle: Send + Sync {
    /// Returns the oracle's raw answer, expected to carry a
    /// `{"risk", "tables": [{"name", "columns"}]}` payload.
    async fn prioritize(&self, candidates: &[ExposureCandidate]) -> Result<String>;
}

/// One labeled field in a classification payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSensitivity {
    pub name: String,
    #[serde(default)]
    pub sensitivity: String,
}

/// Classification payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassificationPayload {
    #[serde(default)]
    pub fields: Vec<FieldSensitivity>,
}

/// One ranked table in a prioritization payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Prioritization payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrioritizationPayload {
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub tables: Vec<RankedEntry>,
}

/// Extracts the JSON payload from an oracle answer.
///
/// Prefers the contents of a fenced code block; otherwise takes the span
/// from the first `{` to the last `}`.
///
/// # Example
/// ```rust
/// use appsurveyor_core::oracle::extract_payload;
///
/// let answer = "Here you go:\n```json\n{\"fields\": []}\n```\nThanks";
/// assert_eq!(extract_payload(answer), Some("{\"fields\": []}"));
/// assert_eq!(extract_payload("no payload here"), None);
/// ```
pub fn extract_payload(answer: &str) -> Option<&str> {
    if let Some(start) = answer.find("```") {
        let after_fence = &answer[start.saturating_add(3)..];
        let body_start = after_fence.find('\n').map_or(0, |i| i.saturating_add(1));
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            let fenced = body[..end].trim();
            if fenced.starts_with('{') {
                return Some(fenced);
            }
        }
    }

    let start = answer.find('{')?;
    let end = answer.rfind('}')?;
    (end > start).then(|| &answer[start..=end])
}

fn parse_payload<T: for<'de> Deserialize<'de>>(answer: &str, what: &str) -> Result<T> {
    let payload = extract_payload(answer).ok_or_else(|| {
        AppSurveyorError::configuration(format!("No JSON payload in {} answer", what))
    })?;
    serde_json::from_str(payload)
        .map_err(|e| AppSurveyorError::serialization(format!("Malformed {} payload", what), e))
}

/// Parses a classification answer.
///
/// # Errors
/// Returns an error if no payload can be located or it does not decode.
pub fn parse_classification(answer: &str) -> Result<ClassificationPayload> {
    parse_payload(answer, "classification")
}

/// Parses a prioritization answer.
///
/// # Errors
/// Returns an error if no payload can be located or it does not decode.
pub fn parse_prioritization(answer: &str) -> Result<PrioritizationPayload> {
    parse_payload(answer, "prioritization")
}
