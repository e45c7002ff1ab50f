//! User-authored sensitivity overrides.

use crate::models::{ColumnLabels, SensitivityLabel};
use std::collections::HashMap;

/// Manual overrides keyed by table id, then column name.
///
/// Only explicit user action writes here. Overrides are sticky for the
/// session and survive classification invalidation.
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    tables: HashMap<String, ColumnLabels>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an override. Returns true if the stored value changed.
    pub fn set(&mut self, table_id: &str, column: &str, label: SensitivityLabel) -> bool {
        let columns = self.tables.entry(table_id.to_string()).or_default();
        columns.insert(column.to_string(), label) != Some(label)
    }

    /// Removes an override. Returns the previous value, if any.
    pub fn remove(&mut self, table_id: &str, column: &str) -> Option<SensitivityLabel> {
        let columns = self.tables.get_mut(table_id)?;
        let previous = columns.remove(column);
        if columns.is_empty() {
            self.tables.remove(table_id);
        }
        previous
    }

    pub fn get(&self, table_id: &str, column: &str) -> Option<SensitivityLabel> {
        self.tables.get(table_id)?.get(column).copied()
    }

    /// All overrides of one table.
    pub fn for_table(&self, table_id: &str) -> Option<&ColumnLabels> {
        self.tables.get(table_id)
    }

    /// Total number of overridden columns.
    pub fn len(&self) -> usize {
        self.tables.values().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_idempotent() {
        let mut store = OverrideStore::new();
        assert!(store.set("users", "email", SensitivityLabel::Low));
        assert!(!store.set("users", "email", SensitivityLabel::Low));
        assert!(store.set("users", "email", SensitivityLabel::High));
        assert_eq!(store.get("users", "email"), Some(SensitivityLabel::High));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_drops_empty_tables() {
        let mut store = OverrideStore::new();
        store.set("users", "email", SensitivityLabel::Moderate);
        assert_eq!(store.remove("users", "email"), Some(SensitivityLabel::Moderate));
        assert!(store.for_table("users").is_none());
        assert!(store.is_empty());
        assert_eq!(store.remove("users", "email"), None);
    }
}
