//! Session-scoped classification cache.
//!
//! Once a table is classified (or its classification failed) the outcome is
//! kept for the rest of the session. Entries are write-once; only an
//! explicit invalidation removes them.

use crate::models::ColumnLabels;
use std::collections::HashMap;

/// Cached outcome for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedClassification {
    /// Labels returned by the oracle
    Classified(ColumnLabels),
    /// The oracle failed; the table counts as having no sensitive columns
    Failed { reason: String },
}

impl CachedClassification {
    /// Labels of a successful classification.
    pub fn labels(&self) -> Option<&ColumnLabels> {
        match self {
            CachedClassification::Classified(labels) => Some(labels),
            CachedClassification::Failed { .. } => None,
        }
    }
}

/// Classification outcomes keyed by table id.
#[derive(Debug, Clone, Default)]
pub struct ClassificationCache {
    entries: HashMap<String, CachedClassification>,
}

impl ClassificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table_id: &str) -> Option<&CachedClassification> {
        self.entries.get(table_id)
    }

    /// True if any outcome is recorded for the table.
    pub fn contains(&self, table_id: &str) -> bool {
        self.entries.contains_key(table_id)
    }

    /// Labels of a successful classification, if any.
    pub fn labels(&self, table_id: &str) -> Option<&ColumnLabels> {
        self.get(table_id).and_then(CachedClassification::labels)
    }

    /// Records an outcome unless one already exists.
    ///
    /// Returns false if the table already had an entry, which is kept.
    pub fn insert(&mut self, table_id: &str, outcome: CachedClassification) -> bool {
        if self.entries.contains_key(table_id) {
            return false;
        }
        self.entries.insert(table_id.to_string(), outcome);
        true
    }

    /// Drops the entry of one table. Returns true if one existed.
    pub fn invalidate(&mut self, table_id: &str) -> bool {
        self.entries.remove(table_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
