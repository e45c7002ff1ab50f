//! Session-scoped scan state.

use super::observer::ScanSnapshot;
use crate::{
    Result,
    error::AppSurveyorError,
    models::{
        AppInfo, ExposureCandidate, ExposureSummary, ScanMetadata, ScanPhase, ScanReport, Table,
    },
    sensitivity::SensitivityLedger,
};
use chrono::{DateTime, Utc};
use std::{collections::HashSet, time::Instant};
use uuid::Uuid;

/// Report format version written by this crate.
pub const REPORT_FORMAT_VERSION: &str = "1.0";

/// All mutable state of one scan.
///
/// A new scan replaces the session wholesale; work tagged with an older
/// session id is discarded.
#[derive(Debug)]
pub struct ScanSession {
    id: Uuid,
    phase: ScanPhase,
    pub(crate) app: Option<AppInfo>,
    pub(crate) tables: Vec<Table>,
    pub(crate) ledger: SensitivityLedger,
    pub(crate) summary: Option<ExposureSummary>,
    /// Candidate set the current summary was computed from
    pub(crate) summary_inputs: Option<Vec<ExposureCandidate>>,
    /// Tables with a classification request outstanding
    pub(crate) in_flight: HashSet<String>,
    pub(crate) batches_planned: usize,
    pub(crate) batches_completed: usize,
    pub(crate) warnings: Vec<String>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: ScanPhase::Idle,
            app: None,
            tables: Vec::new(),
            ledger: SensitivityLedger::new(),
            summary: None,
            summary_inputs: None,
            in_flight: HashSet::new(),
            batches_planned: 0,
            batches_completed: 0,
            warnings: Vec::new(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn ledger(&self) -> &SensitivityLedger {
        &self.ledger
    }

    pub fn summary(&self) -> Option<&ExposureSummary> {
        self.summary.as_ref()
    }

    /// Moves the session to `next`.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::InvalidTransition` for an illegal move.
    pub fn transition(&mut self, next: ScanPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(AppSurveyorError::InvalidTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Moves to `Failed` unless already terminal.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.phase.is_terminal() {
            self.phase = ScanPhase::Failed;
        }
        self.warnings.push(reason.into());
    }

    pub fn table(&self, table_id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == table_id)
    }

    pub(crate) fn table_mut(&mut self, table_id: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.id == table_id)
    }

    /// Looks up a table or fails with `UnknownTable`.
    pub fn require_table(&self, table_id: &str) -> Result<&Table> {
        self.table(table_id)
            .ok_or_else(|| AppSurveyorError::unknown_table(table_id))
    }

    /// Claims a table for classification.
    ///
    /// Returns false if the table already has a cached outcome or another
    /// request for it is outstanding.
    pub(crate) fn begin_classification(&mut self, table_id: &str) -> bool {
        !self.ledger.is_settled(table_id) && self.in_flight.insert(table_id.to_string())
    }

    /// Copies the ledger rollup of a table onto the table itself.
    pub(crate) fn sync_sensitivity(&mut self, table_id: &str) {
        let rollup = self
            .ledger
            .has_rollup(table_id)
            .then(|| self.ledger.rollup(table_id));
        if let Some(table) = self.table_mut(table_id) {
            table.sensitivity = rollup;
        }
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            session_id: self.id,
            phase: self.phase,
            tables: self.tables.clone(),
            summary: self.summary.clone(),
            batches_planned: self.batches_planned,
            batches_completed: self.batches_completed,
        }
    }

    /// Serializable report of the session as it stands.
    pub fn report(&self) -> ScanReport {
        ScanReport {
            format_version: REPORT_FORMAT_VERSION.to_string(),
            session_id: self.id,
            app: self.app.clone(),
            phase: self.phase,
            tables: self.tables.clone(),
            summary: self.summary.clone(),
            metadata: ScanMetadata {
                started_at: self.started_at,
                duration_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
                collector_version: env!("CARGO_PKG_VERSION").to_string(),
                batches_completed: self.batches_completed,
                warnings: self.warnings.clone(),
            },
        }
    }
}
