//! Example-value selection for classification requests.

use crate::models::SampleRow;
use serde_json::Value;

/// Marker appended to truncated example values.
pub const ELLIPSIS: &str = "...";

/// Stringifies a sampled value; `None` for null.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok(),
    }
}

/// Truncates to `max_chars` characters, appending [`ELLIPSIS`] when cut.
pub fn truncate_example(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max_chars).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Picks up to `max_examples` distinct, non-empty example values of a
/// column, in row order.
///
/// # Example
/// ```rust
/// use appsurveyor_core::classifier::samples::collect_examples;
/// use serde_json::json;
///
/// let rows: Vec<_> = [json!({"email": "a@x.com"}), json!({"email": null}), json!({"email": "a@x.com"})]
///     .into_iter()
///     .filter_map(|v| v.as_object().cloned())
///     .collect();
/// assert_eq!(collect_examples(&rows, "email", 3, 100), vec!["a@x.com".to_string()]);
/// ```
pub fn collect_examples(
    rows: &[SampleRow],
    column: &str,
    max_examples: usize,
    max_chars: usize,
) -> Vec<String> {
    let mut examples: Vec<String> = Vec::new();
    for value in rows.iter().filter_map(|row| row.get(column)) {
        if examples.len() >= max_examples {
            break;
        }
        let Some(text) = stringify(value) else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        let example = truncate_example(&text, max_chars);
        if !examples.contains(&example) {
            examples.push(example);
        }
    }
    examples
}
