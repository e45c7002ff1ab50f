//! Progress notifications for scan consumers.
//!
//! The orchestrator publishes an immutable [`ScanSnapshot`] whenever
//! visible state changes. A front end renders snapshots; it never reads
//! session state directly.

use crate::models::{ExposureSummary, ScanPhase, Table};
use uuid::Uuid;

/// Point-in-time view of a scan session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSnapshot {
    pub session_id: Uuid,
    pub phase: ScanPhase,
    pub tables: Vec<Table>,
    pub summary: Option<ExposureSummary>,
    pub batches_planned: usize,
    pub batches_completed: usize,
}

impl ScanSnapshot {
    /// Tables with a computed sensitivity rollup.
    pub fn classified_tables(&self) -> usize {
        self.tables.iter().filter(|t| t.sensitivity.is_some()).count()
    }
}

/// Receives scan progress.
pub trait ScanObserver: Send + Sync {
    fn on_update(&self, snapshot: &ScanSnapshot);
}

/// Observer that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {
    fn on_update(&self, _snapshot: &ScanSnapshot) {}
}

/// Observer that logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ScanObserver for LoggingObserver {
    fn on_update(&self, snapshot: &ScanSnapshot) {
        match snapshot.phase {
            ScanPhase::SensitivityScanning => tracing::info!(
                "Sensitivity scan: batch {}/{} complete, {} tables classified",
                snapshot.batches_completed,
                snapshot.batches_planned,
                snapshot.classified_tables()
            ),
            phase => tracing::info!(
                "Scan {} is {} with {} tables",
                snapshot.session_id,
                phase,
                snapshot.tables.len()
            ),
        }
    }
}
