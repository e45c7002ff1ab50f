//! Cross-table exposure summary.
//!
//! Candidate tables are curated before the prioritization oracle sees
//! them: only tables with confirmed real data, a `high` rollup, and a name
//! that does not look like test or sample data are offered. The oracle's
//! ranking is then trimmed to the configured limits in the oracle's order.

use super::ledger::SensitivityLedger;
use crate::{
    Result,
    config::ScanConfig,
    error::AppSurveyorError,
    models::{
        CandidateColumn, ExposureCandidate, ExposureSummary, RankedTable, SensitivityLabel, Table,
    },
    oracle::{self, PrioritizationOracle, PrioritizationPayload},
};
use std::collections::HashSet;
use tracing::{debug, warn};

/// True if any alphanumeric token of `name` is an excluded term.
///
/// # Example
/// ```rust
/// use appsurveyor_core::sensitivity::is_test_named;
///
/// let terms = vec!["test".to_string(), "dummy".to_string()];
/// assert!(is_test_named("dummy_test", &terms));
/// assert!(!is_test_named("contest_entries", &terms));
/// ```
pub fn is_test_named(name: &str, excluded_terms: &[String]) -> bool {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .any(|token| {
            excluded_terms
                .iter()
                .any(|term| term.eq_ignore_ascii_case(token))
        })
}

/// Selects the tables offered to the prioritization oracle.
///
/// Tables keep the order given; columns are the table's contributing
/// columns with their effective labels.
pub fn select_candidates(
    tables: &[Table],
    ledger: &SensitivityLedger,
    config: &ScanConfig,
) -> Vec<ExposureCandidate> {
    tables
        .iter()
        .filter(|table| table.has_real_data())
        .filter(|table| {
            let excluded = is_test_named(&table.id, &config.excluded_name_terms);
            if excluded {
                debug!("Excluding test-named table '{}' from summary", table.id);
            }
            !excluded
        })
        .filter_map(|table| {
            let rollup = ledger.rollup(&table.id);
            if rollup.level != SensitivityLabel::High {
                return None;
            }
            let columns = rollup
                .contributing_columns
                .iter()
                .map(|name| CandidateColumn {
                    name: name.clone(),
                    label: ledger.effective_sensitivity(&table.id, name),
                })
                .collect();
            Some(ExposureCandidate {
                table_id: table.id.clone(),
                display_name: table.display_name.clone(),
                record_count: table
                    .count
                    .map_or(crate::models::RecordCount::Unknown, |c| c.display_count()),
                columns,
            })
        })
        .collect()
}

fn resolve_candidate<'a>(
    candidates: &'a [ExposureCandidate],
    name: &str,
) -> Option<&'a ExposureCandidate> {
    let name = name.trim();
    candidates
        .iter()
        .find(|c| c.table_id == name)
        .or_else(|| {
            candidates.iter().find(|c| {
                c.table_id.eq_ignore_ascii_case(name) || c.display_name.eq_ignore_ascii_case(name)
            })
        })
}

/// Trims an oracle ranking to the configured limits.
///
/// Entries naming tables outside the candidate set are dropped before the
/// table cap applies, as are repeated tables and columns the candidate
/// does not carry. Oracle order is preserved.
///
/// # Errors
/// Returns `AppSurveyorError::Aggregation` if nothing usable remains.
pub fn apply_ranking(
    payload: &PrioritizationPayload,
    candidates: &[ExposureCandidate],
    config: &ScanConfig,
) -> Result<Vec<RankedTable>> {
    let mut seen = HashSet::new();
    let ranked: Vec<RankedTable> = payload
        .tables
        .iter()
        .filter_map(|entry| {
            let candidate = resolve_candidate(candidates, &entry.name);
            if candidate.is_none() {
                warn!("Ignoring ranked table '{}' outside the candidate set", entry.name);
            }
            candidate.map(|c| (entry, c))
        })
        .filter(|(_, candidate)| seen.insert(candidate.table_id.clone()))
        .take(config.summary_max_tables)
        .map(|(entry, candidate)| {
            let mut columns: Vec<String> = Vec::new();
            for name in &entry.columns {
                let known = candidate.columns.iter().any(|c| &c.name == name);
                if known && !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
            columns.truncate(config.summary_max_columns);
            RankedTable {
                table_id: candidate.table_id.clone(),
                display_name: candidate.display_name.clone(),
                columns,
            }
        })
        .collect();

    if ranked.is_empty() {
        return Err(AppSurveyorError::aggregation_failed(
            "Prioritization ranked no candidate tables",
        ));
    }
    Ok(ranked)
}

/// Asks the prioritization oracle to rank candidates into a summary.
///
/// # Errors
/// Returns `AppSurveyorError::Aggregation` when there are no candidates,
/// the oracle fails, or its ranking is empty. The caller suppresses the
/// summary in every case.
pub async fn build_summary(
    oracle: &dyn PrioritizationOracle,
    candidates: &[ExposureCandidate],
    config: &ScanConfig,
) -> Result<ExposureSummary> {
    if candidates.is_empty() {
        return Err(AppSurveyorError::aggregation_failed(
            "No high-sensitivity tables with data",
        ));
    }

    let answer = oracle
        .prioritize(candidates)
        .await
        .map_err(|e| AppSurveyorError::aggregation_failed(e.to_string()))?;
    let payload = oracle::parse_prioritization(&answer)
        .map_err(|e| AppSurveyorError::aggregation_failed(e.to_string()))?;

    let tables = apply_ranking(&payload, candidates, config)?;
    Ok(ExposureSummary {
        risk: payload.risk.trim().to_string(),
        tables,
        generated_at: chrono::Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnLabels, EnvelopeStatus, RecordCount, TableCount};
    use crate::oracle::RankedEntry;

    fn table_with_data(id: &str) -> Table {
        let mut table = Table::new(id);
        table.count = Some(TableCount {
            count: RecordCount::Exact(10),
            metadata_only: false,
            status: EnvelopeStatus::Success,
        });
        table
    }

    fn candidate(id: &str, columns: &[&str]) -> ExposureCandidate {
        ExposureCandidate {
            table_id: id.to_string(),
            display_name: crate::models::display_name_for(id),
            record_count: RecordCount::Exact(10),
            columns: columns
                .iter()
                .map(|c| CandidateColumn {
                    name: c.to_string(),
                    label: SensitivityLabel::High,
                })
                .collect(),
        }
    }

    fn entry(name: &str, columns: &[&str]) -> RankedEntry {
        RankedEntry {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_test_named_tokens() {
        let terms = ScanConfig::default().excluded_name_terms;
        assert!(is_test_named("dummy_test", &terms));
        assert!(is_test_named("Sample-Orders", &terms));
        assert!(!is_test_named("testimonials", &terms));
        assert!(!is_test_named("users", &terms));
    }

    #[test]
    fn test_candidates_require_high_and_data() {
        let mut ledger = SensitivityLedger::new();
        let high = ColumnLabels::from([("email".to_string(), SensitivityLabel::High)]);
        let moderate = ColumnLabels::from([("zip".to_string(), SensitivityLabel::Moderate)]);
        ledger.record_classification("users", high.clone());
        ledger.record_classification("addresses", moderate);
        ledger.record_classification("dummy_test", high.clone());
        ledger.record_classification("empty", high);

        let mut empty = Table::new("empty");
        empty.count = Some(TableCount {
            count: RecordCount::Exact(0),
            metadata_only: false,
            status: EnvelopeStatus::Success,
        });
        let tables = vec![
            table_with_data("users"),
            table_with_data("addresses"),
            table_with_data("dummy_test"),
            empty,
        ];

        let candidates = select_candidates(&tables, &ledger, &ScanConfig::default());
        let ids: Vec<&str> = candidates.iter().map(|c| c.table_id.as_str()).collect();
        assert_eq!(ids, vec!["users"]);
        assert_eq!(candidates[0].columns[0].name, "email");
    }

    #[test]
    fn test_ranking_caps_and_order() {
        let candidates: Vec<ExposureCandidate> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| candidate(id, &["c1", "c2", "c3", "c4", "c5", "c6"]))
            .collect();
        let payload = PrioritizationPayload {
            risk: "bad".to_string(),
            tables: vec![
                entry("e", &["c6", "c5", "c4", "c3", "c2", "c1"]),
                entry("ghost", &["c1"]),
                entry("b", &["c1", "c1", "nope"]),
                entry("e", &["c1"]),
                entry("a", &[]),
                entry("C", &["c2"]),
                entry("d", &["c3"]),
            ],
        };

        let ranked = apply_ranking(&payload, &candidates, &ScanConfig::default()).unwrap();
        let ids: Vec<&str> = ranked.iter().map(|r| r.table_id.as_str()).collect();
        assert_eq!(ids, vec!["e", "b", "a", "c"]);
        assert_eq!(ranked[0].columns, vec!["c6", "c5", "c4", "c3", "c2"]);
        assert_eq!(ranked[1].columns, vec!["c1"]);
    }

    #[test]
    fn test_empty_ranking_is_aggregation_error() {
        let payload = PrioritizationPayload {
            risk: String::new(),
            tables: vec![entry("ghost", &["x"])],
        };
        let err = apply_ranking(&payload, &[candidate("a", &["x"])], &ScanConfig::default())
            .unwrap_err();
        assert!(matches!(err, AppSurveyorError::Aggregation { .. }));
    }
}
