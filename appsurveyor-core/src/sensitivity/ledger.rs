//! Per-table sensitivity state for one scan session.
//!
//! The ledger is the single owner of classifier output, manual overrides,
//! and the derived rollups. Every mutation recomputes the affected
//! table's rollup before returning, so a rollup is never stale.

use super::overrides::OverrideStore;
use crate::{
    classifier::{CachedClassification, ClassificationCache},
    models::{ColumnLabels, SensitivityLabel, TableSensitivity},
};
use std::collections::{BTreeSet, HashMap};

/// Resolves the effective label of a column.
///
/// Precedence: override, then classifier, then `low`.
pub fn effective_label(
    classified: Option<&ColumnLabels>,
    overrides: Option<&ColumnLabels>,
    column: &str,
) -> SensitivityLabel {
    overrides
        .and_then(|o| o.get(column))
        .or_else(|| classified.and_then(|c| c.get(column)))
        .copied()
        .unwrap_or_default()
}

/// Computes a rollup from classifier output and overrides.
///
/// Contributing columns are those above `low`, `high` before `moderate`,
/// then by name.
pub fn compute_rollup(
    classified: Option<&ColumnLabels>,
    overrides: Option<&ColumnLabels>,
) -> TableSensitivity {
    let columns: BTreeSet<&String> = classified
        .into_iter()
        .flat_map(|c| c.keys())
        .chain(overrides.into_iter().flat_map(|o| o.keys()))
        .collect();

    let mut contributing: Vec<(SensitivityLabel, &String)> = columns
        .into_iter()
        .map(|name| (effective_label(classified, overrides, name), name))
        .filter(|(label, _)| *label > SensitivityLabel::Low)
        .collect();
    contributing.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    TableSensitivity {
        level: contributing
            .first()
            .map_or(SensitivityLabel::Low, |(label, _)| *label),
        contributing_columns: contributing
            .into_iter()
            .map(|(_, name)| name.clone())
            .collect(),
    }
}

/// Classification results, overrides, and rollups of one session.
#[derive(Debug, Clone, Default)]
pub struct SensitivityLedger {
    classifications: ClassificationCache,
    overrides: OverrideStore,
    rollups: HashMap<String, TableSensitivity>,
}

impl SensitivityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The classification cache backing this ledger.
    pub fn classifications(&self) -> &ClassificationCache {
        &self.classifications
    }

    pub fn overrides(&self) -> &OverrideStore {
        &self.overrides
    }

    /// True if the classifier must not be invoked again for this table.
    pub fn is_settled(&self, table_id: &str) -> bool {
        self.classifications.contains(table_id)
    }

    fn recompute(&mut self, table_id: &str) -> TableSensitivity {
        let rollup = compute_rollup(
            self.classifications.labels(table_id),
            self.overrides.for_table(table_id),
        );
        self.rollups.insert(table_id.to_string(), rollup.clone());
        rollup
    }

    /// Records classifier labels for a table.
    ///
    /// Write-once: returns false and keeps the existing entry if the table
    /// already has an outcome.
    pub fn record_classification(&mut self, table_id: &str, labels: ColumnLabels) -> bool {
        let written = self
            .classifications
            .insert(table_id, CachedClassification::Classified(labels));
        if written {
            self.recompute(table_id);
        }
        written
    }

    /// Records a failed classification so it is not retried this session.
    pub fn record_failure(&mut self, table_id: &str, reason: impl Into<String>) -> bool {
        let written = self.classifications.insert(
            table_id,
            CachedClassification::Failed {
                reason: reason.into(),
            },
        );
        if written {
            self.recompute(table_id);
        }
        written
    }

    /// Sets a manual override and returns the recomputed rollup.
    ///
    /// Setting the same value twice yields the same state.
    pub fn set_override(
        &mut self,
        table_id: &str,
        column: &str,
        label: SensitivityLabel,
    ) -> TableSensitivity {
        self.overrides.set(table_id, column, label);
        self.recompute(table_id)
    }

    /// Removes a manual override and returns the recomputed rollup.
    pub fn clear_override(&mut self, table_id: &str, column: &str) -> TableSensitivity {
        self.overrides.remove(table_id, column);
        self.recompute(table_id)
    }

    /// Drops the classifier outcome of a table; overrides are kept.
    ///
    /// Returns true if an outcome existed.
    pub fn clear_classification(&mut self, table_id: &str) -> bool {
        let existed = self.classifications.invalidate(table_id);
        self.recompute(table_id);
        existed
    }

    /// Effective label of one column.
    pub fn effective_sensitivity(&self, table_id: &str, column: &str) -> SensitivityLabel {
        effective_label(
            self.classifications.labels(table_id),
            self.overrides.for_table(table_id),
            column,
        )
    }

    /// Effective labels of every column the ledger knows for a table.
    pub fn effective_labels(&self, table_id: &str) -> ColumnLabels {
        let classified = self.classifications.labels(table_id);
        let overrides = self.overrides.for_table(table_id);
        classified
            .into_iter()
            .flat_map(|c| c.keys())
            .chain(overrides.into_iter().flat_map(|o| o.keys()))
            .map(|name| (name.clone(), effective_label(classified, overrides, name)))
            .collect()
    }

    /// Current rollup of a table; `low` with no contributors if unknown.
    pub fn rollup(&self, table_id: &str) -> TableSensitivity {
        self.rollups.get(table_id).cloned().unwrap_or_default()
    }

    /// True once a rollup exists for the table.
    pub fn has_rollup(&self, table_id: &str) -> bool {
        self.rollups.contains_key(table_id)
    }
}
