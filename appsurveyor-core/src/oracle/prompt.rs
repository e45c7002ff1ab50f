//! Prompt construction for chat-completion oracles.

use super::ClassificationRequest;
use crate::models::ExposureCandidate;
use std::fmt::Write as _;

/// System instruction for column classification.
pub const CLASSIFICATION_SYSTEM: &str = "You classify database columns by privacy risk. \
Use \"high\" for personal or business data that identifies people or reveals private \
activity (emails, names, phone numbers, addresses, payment details, credentials, \
private messages), \"moderate\" for data that is sensitive only in combination with \
other fields, and \"low\" for everything else. Answer with JSON only: \
{\"fields\": [{\"name\": \"<column>\", \"sensitivity\": \"low|moderate|high\"}]}.";

/// System instruction for cross-table prioritization.
pub const PRIORITIZATION_SYSTEM: &str = "You rank exposed application tables by how \
damaging their public exposure would be. Answer with JSON only: {\"risk\": \"<one \
paragraph overall assessment>\", \"tables\": [{\"name\": \"<table id>\", \"columns\": \
[\"<most sensitive column first>\"]}]}. Use only table ids and column names from the \
input, most severe table first.";

/// Renders the user message for a classification request.
pub fn classification_prompt(request: &ClassificationRequest) -> String {
    let mut prompt = format!(
        "Table: {} ({})\nColumns with example values:\n",
        request.display_name, request.table_id
    );
    for column in &request.columns {
        let examples = if column.examples.is_empty() {
            "(no values)".to_string()
        } else {
            column
                .examples
                .iter()
                .map(|e| format!("{:?}", e))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let _ = writeln!(prompt, "- {}: {}", column.name, examples);
    }
    prompt
}

/// Renders the user message for a prioritization request.
pub fn prioritization_prompt(candidates: &[ExposureCandidate]) -> String {
    let mut prompt = String::from("Exposed tables:\n");
    for candidate in candidates {
        let columns = candidate
            .columns
            .iter()
            .map(|c| format!("{} ({})", c.name, c.label))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            prompt,
            "- {} \"{}\", records: {}, columns: {}",
            candidate.table_id, candidate.display_name, candidate.record_count, columns
        );
    }
    prompt
}
