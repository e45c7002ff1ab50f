//! Core data models for discovered tables and their sensitivity.
//!
//! These structures carry a scan from schema discovery through sampling,
//! classification, and aggregation. Everything is serializable so a scan
//! can be written out as a [`ScanReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata keys attached to every sampled record by the search backend.
///
/// These are never treated as data columns.
pub const RESERVED_KEYS: [&str; 3] = ["_id", "_type", "_version"];

/// Returns true if `key` is one of the reserved metadata keys.
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// A single sampled record: column name to heterogeneous JSON value.
pub type SampleRow = serde_json::Map<String, serde_json::Value>;

/// Per-column labels for one table, keyed by column name.
pub type ColumnLabels = BTreeMap<String, SensitivityLabel>;

/// Privacy risk of a column.
///
/// Ordering is significant: `High > Moderate > Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityLabel {
    /// Not sensitive; the implicit default
    #[default]
    Low,
    /// Potentially sensitive in combination with other data
    Moderate,
    /// Personal or business data that should not be exposed
    High,
}

impl SensitivityLabel {
    /// Parses a label as returned by an oracle or typed by a user.
    ///
    /// Accepts a few common synonyms; returns `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "none" | "not sensitive" | "public" => Some(Self::Low),
            "moderate" | "medium" => Some(Self::Moderate),
            "high" | "critical" => Some(Self::High),
            _ => None,
        }
    }

    /// Lowercase wire name of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitivityLabel::Low => "low",
            SensitivityLabel::Moderate => "moderate",
            SensitivityLabel::High => "high",
        }
    }
}

impl std::fmt::Display for SensitivityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SensitivityLabel {
    type Err = crate::error::AppSurveyorError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s).ok_or_else(|| {
            crate::error::AppSurveyorError::configuration(format!(
                "Unknown sensitivity label '{}', expected low, moderate, or high",
                s
            ))
        })
    }
}

/// A column of a discovered table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    /// True when the column was first seen in sampled data, not the schema
    #[serde(default)]
    pub discovered: bool,
}

impl Column {
    /// Creates a column declared by the schema description.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            discovered: false,
        }
    }

    /// Creates a column discovered only from sampled rows.
    pub fn discovered(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: "unknown".to_string(),
            discovered: true,
        }
    }
}

/// Record count of a table as reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecordCount {
    /// The exact number of records
    Exact(u64),
    /// The request cap was reached and more records exist
    AtLeast(u64),
    /// The count could not be determined
    Unknown,
}

impl RecordCount {
    /// True for an exact count.
    pub fn is_exact(&self) -> bool {
        matches!(self, RecordCount::Exact(_))
    }

    /// True if the count shows at least one record.
    pub fn has_records(&self) -> bool {
        match self {
            RecordCount::Exact(n) | RecordCount::AtLeast(n) => *n > 0,
            RecordCount::Unknown => false,
        }
    }

    /// Numeric lower bound, if known.
    pub fn value(&self) -> Option<u64> {
        match self {
            RecordCount::Exact(n) | RecordCount::AtLeast(n) => Some(*n),
            RecordCount::Unknown => None,
        }
    }
}

impl std::fmt::Display for RecordCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordCount::Exact(n) => write!(f, "{}", n),
            RecordCount::AtLeast(n) => write!(f, "{}+", n),
            RecordCount::Unknown => f.write_str("?"),
        }
    }
}

/// How the data-access service answered a count request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvelopeStatus {
    /// A success envelope (possibly with zero hits)
    Success,
    /// An error-status envelope; counted as zero but never as confirmed data
    ErrorStatus { status: u16 },
    /// Transport or parse failure; count unknown
    Unavailable,
}

/// Count outcome for one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCount {
    pub count: RecordCount,
    /// Every returned record carried only reserved metadata keys
    pub metadata_only: bool,
    pub status: EnvelopeStatus,
}

impl TableCount {
    /// Count for a table whose request failed outright.
    pub fn unavailable() -> Self {
        Self {
            count: RecordCount::Unknown,
            metadata_only: false,
            status: EnvelopeStatus::Unavailable,
        }
    }

    /// True if the table is confirmed to hold real, non-metadata-only data.
    pub fn has_real_data(&self) -> bool {
        self.status == EnvelopeStatus::Success && self.count.has_records() && !self.metadata_only
    }

    /// Count shown to the user; metadata-only tables display as zero.
    pub fn display_count(&self) -> RecordCount {
        if self.metadata_only {
            RecordCount::Exact(0)
        } else {
            self.count
        }
    }
}

/// Derived table-level sensitivity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSensitivity {
    pub level: SensitivityLabel,
    /// Columns with an effective label above `low`, most sensitive first
    pub contributing_columns: Vec<String>,
}

/// A discovered table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Canonical, de-artifacted identifier; unique within a scan
    pub id: String,
    pub display_name: String,
    pub columns: Vec<Column>,
    pub count: Option<TableCount>,
    pub sensitivity: Option<TableSensitivity>,
}

impl Table {
    /// Creates a table with a display name derived from its id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let display_name = display_name_for(&id);
        Self {
            id,
            display_name,
            columns: Vec::new(),
            count: None,
            sensitivity: None,
        }
    }

    /// Builder method to attach schema columns.
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        for column in columns {
            self.push_column(column);
        }
        self
    }

    /// Adds a column unless one with the same name already exists.
    ///
    /// Returns true if the column was added.
    pub fn push_column(&mut self, column: Column) -> bool {
        if is_reserved_key(&column.name) || self.has_column(&column.name) {
            return false;
        }
        self.columns.push(column);
        true
    }

    /// Appends columns seen in sampled data but absent from the schema.
    ///
    /// Returns the number of columns added.
    pub fn add_discovered_columns<'a, I>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|name| self.push_column(Column::discovered(*name)))
            .count()
    }

    /// True if a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// True once counting confirmed real, non-metadata-only data.
    pub fn has_real_data(&self) -> bool {
        self.count.is_some_and(|c| c.has_real_data())
    }
}

/// Derives a human-readable name from a table identifier.
///
/// The first character is capitalized and underscores become spaces.
pub fn display_name_for(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => {
            let rest: String = chars.as_str().replace('_', " ");
            format!("{}{}", first.to_uppercase(), rest)
        }
        None => String::new(),
    }
}

/// Sorts tables for display, case-insensitively by display name.
pub fn sort_for_display(tables: &mut [Table]) {
    tables.sort_by_key(|t| t.display_name.to_lowercase());
}

/// Identity of the scanned application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Origin of the application (scheme, host, port)
    pub app_url: String,
    /// Backend application name used by the data-access service
    pub app_name: String,
}

/// Lifecycle of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanPhase {
    Idle,
    SchemaLoading,
    TableListReady,
    SensitivityScanning,
    Complete,
    Failed,
}

impl ScanPhase {
    /// True if `next` is a legal successor of this phase.
    ///
    /// Phases advance strictly in order; `Failed` is reachable from any
    /// non-terminal phase.
    pub fn can_transition_to(&self, next: ScanPhase) -> bool {
        use ScanPhase::*;
        matches!(
            (self, next),
            (Idle, SchemaLoading)
                | (SchemaLoading, TableListReady)
                | (TableListReady, SensitivityScanning)
                | (SensitivityScanning, Complete)
                | (Idle | SchemaLoading | TableListReady | SensitivityScanning, Failed)
        )
    }

    /// True for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanPhase::Complete | ScanPhase::Failed)
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScanPhase::Idle => "Idle",
            ScanPhase::SchemaLoading => "SchemaLoading",
            ScanPhase::TableListReady => "TableListReady",
            ScanPhase::SensitivityScanning => "SensitivityScanning",
            ScanPhase::Complete => "Complete",
            ScanPhase::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// A column offered to the prioritization oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateColumn {
    pub name: String,
    pub label: SensitivityLabel,
}

/// A table eligible for the cross-table exposure summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureCandidate {
    pub table_id: String,
    pub display_name: String,
    pub record_count: RecordCount,
    pub columns: Vec<CandidateColumn>,
}

/// One entry of the ranked exposure summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedTable {
    pub table_id: String,
    pub display_name: String,
    pub columns: Vec<String>,
}

/// Ranked cross-table exposure summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureSummary {
    /// Free-text overall risk assessment from the oracle
    pub risk: String,
    /// Ranked tables, most exposed first
    pub tables: Vec<RankedTable>,
    pub generated_at: DateTime<Utc>,
}

/// Metadata about a finished (or failed) scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub collector_version: String,
    pub batches_completed: usize,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Serialized result of a scan session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub format_version: String,
    pub session_id: uuid::Uuid,
    pub app: Option<AppInfo>,
    pub phase: ScanPhase,
    pub tables: Vec<Table>,
    pub summary: Option<ExposureSummary>,
    pub metadata: ScanMetadata,
}

impl ScanReport {
    /// Number of tables confirmed to hold real data.
    pub fn tables_with_data(&self) -> usize {
        self.tables.iter().filter(|t| t.has_real_data()).count()
    }

    /// Number of tables whose rollup is `high`.
    pub fn high_sensitivity_tables(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| {
                t.sensitivity
                    .as_ref()
                    .is_some_and(|s| s.level == SensitivityLabel::High)
            })
            .count()
    }
}

#[cfg(test)]
mod tests;
