//! Plain-text rendering of scan results for the terminal.

use appsurveyor_core::{
    EnvelopeStatus, ExposureSummary, ScanReport, Table, TableCount, TableView,
};
use serde::Serialize;
use std::fmt::Write;

/// One line of the table listing in machine-readable form.
#[derive(Debug, Serialize)]
pub struct TableListing<'a> {
    pub id: &'a str,
    pub display_name: &'a str,
    pub records: String,
    pub has_data: bool,
    pub sensitivity: Option<&'static str>,
}

impl<'a> TableListing<'a> {
    pub fn from_table(table: &'a Table) -> Self {
        Self {
            id: &table.id,
            display_name: &table.display_name,
            records: count_label(table.count.as_ref()),
            has_data: table.has_real_data(),
            sensitivity: table.sensitivity.as_ref().map(|s| s.level.as_str()),
        }
    }
}

/// Human-readable record count, noting error envelopes.
pub fn count_label(count: Option<&TableCount>) -> String {
    match count {
        None => "-".to_string(),
        Some(count) => match count.status {
            EnvelopeStatus::ErrorStatus { status } => format!("0 (error {})", status),
            EnvelopeStatus::Unavailable => "?".to_string(),
            EnvelopeStatus::Success => count.display_count().to_string(),
        },
    }
}

/// Renders the table list as aligned columns.
pub fn render_tables(tables: &[Table]) -> String {
    let width = tables
        .iter()
        .map(|t| t.display_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("TABLE".len());

    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:>12}  SENSITIVITY", "TABLE", "RECORDS");
    for table in tables {
        let line = TableListing::from_table(table);
        let _ = writeln!(
            out,
            "{:<width$}  {:>12}  {}",
            line.display_name,
            line.records,
            line.sensitivity.unwrap_or("-"),
        );
    }
    out
}

/// Renders one table's columns with their effective sensitivity.
pub fn render_view(view: &TableView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} records, {} sampled)",
        view.table.display_name,
        count_label(Some(&view.count)),
        view.rows.len()
    );
    if view.classification_failed {
        let _ = writeln!(out, "classification failed; labels default to low");
    }

    let width = view
        .columns
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("COLUMN".len());
    let _ = writeln!(out, "{:<width$}  {:<10}  SENSITIVITY", "COLUMN", "TYPE");
    for column in &view.columns {
        let mut flags = Vec::new();
        if column.discovered {
            flags.push("discovered");
        }
        if column.overridden {
            flags.push("override");
        }
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        let _ = writeln!(
            out,
            "{:<width$}  {:<10}  {}{}",
            column.name, column.column_type, column.sensitivity, suffix
        );
    }
    out
}

/// Renders the ranked exposure summary.
pub fn render_summary(summary: &ExposureSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Exposure summary: {}", summary.risk);
    for (rank, table) in summary.tables.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {}: {}",
            rank.saturating_add(1),
            table.display_name,
            table.columns.join(", ")
        );
    }
    out
}

/// One-paragraph result of a finished scan.
pub fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Tables: {}", report.tables.len());
    let _ = writeln!(out, "Tables with data: {}", report.tables_with_data());
    let _ = writeln!(
        out,
        "High sensitivity tables: {}",
        report.high_sensitivity_tables()
    );
    if !report.metadata.warnings.is_empty() {
        let _ = writeln!(out, "Warnings: {}", report.metadata.warnings.len());
    }
    if let Some(summary) = &report.summary {
        out.push_str(&render_summary(summary));
    }
    out
}
