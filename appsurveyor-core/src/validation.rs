//! JSON Schema validation for the `.appsurveyor.json` report format.
//!
//! Reports are validated before they are written. Beyond structure, the
//! validator refuses any report that carries an access token value, a
//! credential-named field, or a URL with a token-bearing query string.
//!
//! # Example
//! ```rust
//! use appsurveyor_core::validation::{initialize_report_validator, validate_report_output};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! initialize_report_validator()?;
//! let report = json!({
//!     "format_version": "1.0",
//!     "session_id": "9f1c2a36-52d4-4f7e-9d6e-2b0b8c1f4a10",
//!     "app": null,
//!     "phase": "Complete",
//!     "tables": [],
//!     "summary": null,
//!     "metadata": {
//!         "started_at": "2024-01-15T10:30:00Z",
//!         "duration_ms": 1500,
//!         "collector_version": "0.1.0",
//!         "batches_completed": 0,
//!         "warnings": []
//!     }
//! });
//! validate_report_output(&report, &[])?;
//! # Ok(())
//! # }
//! ```

use crate::models::ScanReport;
use jsonschema::Validator;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// JSON Schema validation errors with field-level reporting
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Schema compilation failed during initialization
    #[error("JSON Schema compilation failed: {message}")]
    SchemaCompilation { message: String },

    /// Validation failed with specific field errors
    #[error("Report validation failed with {error_count} errors: {errors:?}")]
    ValidationFailed {
        error_count: usize,
        errors: Vec<String>,
    },

    /// Unsupported format version detected
    #[error("Unsupported format version '{version}'. Supported versions: {supported:?}")]
    UnsupportedVersion {
        version: String,
        supported: Vec<String>,
    },

    /// Potential credential exposure
    #[error("Security validation failed: {reason}")]
    SecurityViolation { reason: String },

    /// JSON parsing error
    #[error("JSON parsing failed: {source}")]
    JsonParsing {
        #[from]
        source: serde_json::Error,
    },
}

/// Supported format versions for backward compatibility
const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Field names that must never appear in a report
const CREDENTIAL_KEYS: &[&str] = &["token", "api_key", "apikey", "authorization", "password", "secret"];

/// Embedded JSON Schema for v1.0 report validation
const SCHEMA_V1_0: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "AppSurveyor Scan Report Format v1.0",
  "type": "object",
  "required": ["format_version", "session_id", "phase", "tables", "metadata"],
  "$defs": {
    "label": { "enum": ["low", "moderate", "high"] },
    "record_count": {
      "oneOf": [
        {
          "type": "object",
          "required": ["kind", "value"],
          "properties": {
            "kind": { "enum": ["exact", "at_least"] },
            "value": { "type": "integer", "minimum": 0 }
          }
        },
        {
          "type": "object",
          "required": ["kind"],
          "properties": { "kind": { "const": "unknown" } }
        }
      ]
    },
    "table": {
      "type": "object",
      "required": ["id", "display_name", "columns"],
      "properties": {
        "id": { "type": "string", "minLength": 1 },
        "display_name": { "type": "string" },
        "columns": {
          "type": "array",
          "items": {
            "type": "object",
            "required": ["name", "type"],
            "properties": {
              "name": { "type": "string", "minLength": 1 },
              "type": { "type": "string" },
              "discovered": { "type": "boolean" }
            }
          }
        },
        "count": {
          "oneOf": [
            { "type": "null" },
            {
              "type": "object",
              "required": ["count", "metadata_only", "status"],
              "properties": {
                "count": { "$ref": "#/$defs/record_count" },
                "metadata_only": { "type": "boolean" },
                "status": {
                  "type": "object",
                  "required": ["kind"],
                  "properties": {
                    "kind": { "enum": ["success", "error_status", "unavailable"] },
                    "status": { "type": "integer" }
                  }
                }
              }
            }
          ]
        },
        "sensitivity": {
          "oneOf": [
            { "type": "null" },
            {
              "type": "object",
              "required": ["level", "contributing_columns"],
              "properties": {
                "level": { "$ref": "#/$defs/label" },
                "contributing_columns": { "type": "array", "items": { "type": "string" } }
              }
            }
          ]
        }
      }
    }
  },
  "properties": {
    "format_version": { "type": "string", "pattern": "^1\\.0$" },
    "session_id": { "type": "string", "minLength": 1 },
    "app": {
      "oneOf": [
        { "type": "null" },
        {
          "type": "object",
          "required": ["app_url", "app_name"],
          "properties": {
            "app_url": { "type": "string", "pattern": "^https?://[^?#]*$" },
            "app_name": { "type": "string", "minLength": 1 }
          }
        }
      ]
    },
    "phase": {
      "enum": ["Idle", "SchemaLoading", "TableListReady", "SensitivityScanning", "Complete", "Failed"]
    },
    "tables": { "type": "array", "items": { "$ref": "#/$defs/table" } },
    "summary": {
      "oneOf": [
        { "type": "null" },
        {
          "type": "object",
          "required": ["risk", "tables", "generated_at"],
          "properties": {
            "risk": { "type": "string" },
            "generated_at": { "type": "string" },
            "tables": {
              "type": "array",
              "minItems": 1,
              "items": {
                "type": "object",
                "required": ["table_id", "display_name", "columns"],
                "properties": {
                  "table_id": { "type": "string" },
                  "display_name": { "type": "string" },
                  "columns": { "type": "array", "items": { "type": "string" } }
                }
              }
            }
          }
        }
      ]
    },
    "metadata": {
      "type": "object",
      "required": ["started_at", "duration_ms", "collector_version", "batches_completed"],
      "properties": {
        "started_at": { "type": "string" },
        "duration_ms": { "type": "integer", "minimum": 0 },
        "collector_version": { "type": "string", "minLength": 1 },
        "batches_completed": { "type": "integer", "minimum": 0 },
        "warnings": { "type": "array", "items": { "type": "string" }, "default": [] }
      }
    }
  }
}"##;

/// Compiled JSON Schema instance (initialized once)
static COMPILED_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Matches a query string carrying a token-like parameter
static TOKEN_QUERY: OnceLock<Option<Regex>> = OnceLock::new();

fn token_query_regex() -> Option<&'static Regex> {
    TOKEN_QUERY
        .get_or_init(|| Regex::new(r"(?i)[?&](x|y|token|api_key|apikey|key)=[^&\s]+").ok())
        .as_ref()
}

/// Compiles the embedded report schema and caches it for reuse.
///
/// # Errors
/// Returns `ValidationError::SchemaCompilation` if the embedded schema is invalid.
pub fn initialize_report_validator() -> Result<(), ValidationError> {
    let schema_json: Value =
        serde_json::from_str(SCHEMA_V1_0).map_err(|e| ValidationError::SchemaCompilation {
            message: format!("Failed to parse embedded schema: {}", e),
        })?;

    let compiled = jsonschema::validator_for(&schema_json).map_err(|e| {
        ValidationError::SchemaCompilation {
            message: format!("Schema compilation error: {}", e),
        }
    })?;

    let _ = COMPILED_SCHEMA.set(compiled);
    Ok(())
}

/// Validates a serialized [`ScanReport`].
///
/// `secrets` are the raw access token values of the scan; none of them
/// may occur anywhere in the report.
///
/// # Errors
/// Returns a structural, version, or security validation error.
pub fn validate_report_output(json_value: &Value, secrets: &[&str]) -> Result<(), ValidationError> {
    let schema = COMPILED_SCHEMA
        .get()
        .ok_or_else(|| ValidationError::SchemaCompilation {
            message: "Report validator not initialized. Call initialize_report_validator() first."
                .to_string(),
        })?;

    validate_format_version(json_value)?;

    if let Err(validation_error) = schema.validate(json_value) {
        return Err(ValidationError::ValidationFailed {
            error_count: 1,
            errors: vec![format!("Report validation failed: {}", validation_error)],
        });
    }

    validate_no_credentials(json_value, "", secrets)
}

/// Parses and validates a report in one step.
///
/// # Errors
/// Returns `JsonParsing` for malformed JSON and any validation error.
pub fn validate_and_parse_report(json: &str) -> Result<ScanReport, ValidationError> {
    let value: Value = serde_json::from_str(json)?;
    validate_report_output(&value, &[])?;
    Ok(serde_json::from_value(value)?)
}

/// The embedded report schema, for documentation and tooling.
pub fn get_schema_definition() -> &'static str {
    SCHEMA_V1_0
}

fn validate_format_version(json_value: &Value) -> Result<(), ValidationError> {
    let version = json_value
        .get("format_version")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ValidationError::ValidationFailed {
            error_count: 1,
            errors: vec!["Missing required field 'format_version'".to_string()],
        })?;

    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(ValidationError::UnsupportedVersion {
            version: version.to_string(),
            supported: SUPPORTED_VERSIONS.iter().map(|s| s.to_string()).collect(),
        });
    }
    Ok(())
}

fn is_credential_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    CREDENTIAL_KEYS.iter().any(|term| lower.contains(term))
}

/// Recursively checks keys and string values for credential exposure.
///
/// Table and column names are values, so a column called `password` is
/// reported on, not rejected.
fn validate_no_credentials(value: &Value, path: &str, secrets: &[&str]) -> Result<(), ValidationError> {
    match value {
        Value::String(s) => {
            if secrets.iter().any(|secret| !secret.is_empty() && s.contains(secret)) {
                return Err(ValidationError::SecurityViolation {
                    reason: format!("Access token value found at path '{}'", path),
                });
            }
            if token_query_regex().is_some_and(|re| re.is_match(s)) {
                return Err(ValidationError::SecurityViolation {
                    reason: format!("Token-bearing query string found at path '{}'", path),
                });
            }
        }
        Value::Object(obj) => {
            for (key, val) in obj {
                if is_credential_key(key) {
                    return Err(ValidationError::SecurityViolation {
                        reason: format!("Credential-related field name found: '{}'", key),
                    });
                }
                let new_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                validate_no_credentials(val, &new_path, secrets)?;
            }
        }
        Value::Array(arr) => {
            for (index, item) in arr.iter().enumerate() {
                validate_no_credentials(item, &format!("{}[{}]", path, index), secrets)?;
            }
        }
        _ => {}
    }
    Ok(())
}
