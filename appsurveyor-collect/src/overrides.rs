//! Parsing of `table.column=label` override arguments.

use appsurveyor_core::SensitivityLabel;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing an override argument.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverrideParseError {
    #[error("Override '{0}' must have the form table.column=label")]
    Malformed(String),

    #[error("Unknown sensitivity label '{0}', expected low, moderate, or high")]
    UnknownLabel(String),
}

/// A manual sensitivity override for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideSpec {
    pub table: String,
    pub column: String,
    pub label: SensitivityLabel,
}

impl FromStr for OverrideSpec {
    type Err = OverrideParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || OverrideParseError::Malformed(s.to_string());

        let (target, label) = s.split_once('=').ok_or_else(malformed)?;
        // Table ids never contain dots; column names may.
        let (table, column) = target.split_once('.').ok_or_else(malformed)?;
        let (table, column, label) = (table.trim(), column.trim(), label.trim());
        if table.is_empty() || column.is_empty() {
            return Err(malformed());
        }

        let label = SensitivityLabel::parse(label)
            .ok_or_else(|| OverrideParseError::UnknownLabel(label.to_string()))?;

        Ok(Self {
            table: table.to_string(),
            column: column.to_string(),
            label,
        })
    }
}

impl std::fmt::Display for OverrideSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}={}", self.table, self.column, self.label)
    }
}
