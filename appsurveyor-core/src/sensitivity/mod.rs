//! Override reconciliation and sensitivity aggregation.
//!
//! - [`overrides`]: user-authored labels that take precedence over the classifier
//! - [`ledger`]: per-table effective sensitivity and rollups
//! - [`summary`]: candidate curation and the ranked exposure summary

pub mod ledger;
pub mod overrides;
pub mod summary;

pub use ledger::{SensitivityLedger, compute_rollup, effective_label};
pub use overrides::OverrideStore;
pub use summary::{apply_ranking, build_summary, is_test_named, select_candidates};
