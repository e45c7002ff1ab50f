//! Normalization of heterogeneous data-access responses.
//!
//! The data-access service answers in one of several envelope shapes.
//! [`normalize`] resolves them in a fixed priority order and stops at the
//! first shape that matches; shapes are never merged.

use crate::models::{RESERVED_KEYS, SampleRow, is_reserved_key};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};

/// Response shape recognized by [`normalize`], in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// The response itself is an array of records
    BareArray,
    /// Search-engine envelope with `hits.hits[]` (optionally under `body`)
    SearchHits,
    /// Cursor-paginated envelope with a `results` array (optionally under `response`)
    CursorResults,
    /// The first array-valued property found anywhere in the envelope
    FirstArray,
    /// Nothing recognizable
    Unrecognized,
}

/// Search-engine envelope details relevant to counting.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchEnvelope<'a> {
    pub hits: &'a [Value],
    /// Upstream end-of-results marker, if present
    pub at_end: Option<bool>,
}

/// Locates the `hits.hits` array, checking `body.hits.hits` first.
pub fn search_envelope(raw: &Value) -> Option<SearchEnvelope<'_>> {
    for container in [raw.get("body"), Some(raw)].into_iter().flatten() {
        if let Some(hits) = container
            .get("hits")
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
        {
            return Some(SearchEnvelope {
                hits,
                at_end: container.get("at_end").and_then(Value::as_bool),
            });
        }
    }
    None
}

/// Returns the status of an error-status envelope (`status >= 400`).
pub fn error_status(raw: &Value) -> Option<u16> {
    raw.get("status")
        .and_then(Value::as_u64)
        .filter(|status| *status >= 400)
        .and_then(|status| u16::try_from(status).ok())
}

fn cursor_results(raw: &Value) -> Option<&Vec<Value>> {
    raw.pointer("/response/results")
        .and_then(Value::as_array)
        .or_else(|| raw.get("results").and_then(Value::as_array))
}

/// Breadth-first search for the first array-valued property.
fn first_array(raw: &Value) -> Option<&Vec<Value>> {
    let mut queue: VecDeque<&Value> = VecDeque::from([raw]);
    while let Some(value) = queue.pop_front() {
        if let Value::Object(map) = value {
            for child in map.values() {
                match child {
                    Value::Array(items) => return Some(items),
                    Value::Object(_) => queue.push_back(child),
                    _ => {}
                }
            }
        }
    }
    None
}

/// Determines which shape [`normalize`] will use for a response.
pub fn detect_shape(raw: &Value) -> ResponseShape {
    if raw.is_array() {
        ResponseShape::BareArray
    } else if search_envelope(raw).is_some() {
        ResponseShape::SearchHits
    } else if cursor_results(raw).is_some() {
        ResponseShape::CursorResults
    } else if first_array(raw).is_some() {
        ResponseShape::FirstArray
    } else {
        ResponseShape::Unrecognized
    }
}

/// Flattens one search hit: `_source` spread into the row, metadata attached.
fn flatten_hit(hit: &Value) -> Option<SampleRow> {
    let hit = hit.as_object()?;
    let mut row = match hit.get("_source") {
        Some(Value::Object(source)) => source.clone(),
        _ => SampleRow::new(),
    };
    for key in RESERVED_KEYS {
        if let Some(value) = hit.get(key) {
            row.insert(key.to_string(), value.clone());
        }
    }
    Some(row)
}

fn object_rows(items: &[Value]) -> Vec<SampleRow> {
    items.iter().filter_map(|v| v.as_object().cloned()).collect()
}

/// Normalizes a raw response into a uniform row set.
///
/// Priority: bare array, then `hits.hits`, then `results`, then the first
/// array property. Non-object items are dropped. An unrecognized response
/// yields an empty list.
///
/// # Example
/// ```rust
/// use appsurveyor_core::results::normalize;
/// use serde_json::json;
///
/// let raw = json!({
///     "results": [{"email": "ignored@x.com"}],
///     "hits": {"hits": [{"_id": "1", "_source": {"email": "a@x.com"}}]}
/// });
/// let rows = normalize(&raw);
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0]["email"], "a@x.com");
/// assert_eq!(rows[0]["_id"], "1");
/// ```
pub fn normalize(raw: &Value) -> Vec<SampleRow> {
    match detect_shape(raw) {
        ResponseShape::BareArray => raw.as_array().map_or_else(Vec::new, |items| object_rows(items)),
        ResponseShape::SearchHits => search_envelope(raw)
            .map_or_else(Vec::new, |env| env.hits.iter().filter_map(flatten_hit).collect()),
        ResponseShape::CursorResults => {
            cursor_results(raw).map_or_else(Vec::new, |items| object_rows(items))
        }
        ResponseShape::FirstArray => first_array(raw).map_or_else(Vec::new, |items| object_rows(items)),
        ResponseShape::Unrecognized => Vec::new(),
    }
}

/// Data column names in first-seen order across rows, reserved keys hidden.
pub fn data_columns(rows: &[SampleRow]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !is_reserved_key(key) && seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// True if there is at least one row and no row carries a data column.
pub fn is_metadata_only(rows: &[SampleRow]) -> bool {
    !rows.is_empty() && rows.iter().all(|row| row.keys().all(|k| is_reserved_key(k)))
}
