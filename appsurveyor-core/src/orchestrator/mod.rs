//! Batch orchestration of a scan session.
//!
//! The [`ScanOrchestrator`] owns exactly one active [`ScanSession`] and
//! drives it through `Idle → SchemaLoading → TableListReady →
//! SensitivityScanning → Complete`. Table counts are fetched fully in
//! parallel; classification runs in fixed-size concurrent batches, one
//! batch at a time, with a snapshot published after each batch.
//!
//! # Supersession
//! Starting discovery replaces the session. Work is tagged with the id of
//! the session it started in, and results are applied only if that
//! session is still active. The lock is never held across network I/O.

pub mod observer;
pub mod session;

pub use observer::{LoggingObserver, NoopObserver, ScanObserver, ScanSnapshot};
pub use session::{REPORT_FORMAT_VERSION, ScanSession};

use crate::{
    Result,
    adapters::{DataAccess, SchemaSource, normalize_app_url},
    classifier::{CachedClassification, Classifier},
    config::ScanConfig,
    error::{AppSurveyorError, redact_url},
    models::{
        AppInfo, ColumnLabels, EnvelopeStatus, ExposureSummary, SampleRow, ScanPhase, ScanReport,
        SensitivityLabel, Table, TableCount, TableSensitivity, sort_for_display,
    },
    oracle::{ClassificationOracle, PrioritizationOracle},
    results,
    sampler::Sampler,
    schema::SchemaParser,
    sensitivity::{SensitivityLedger, build_summary, select_candidates},
};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// External services a scan depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub schema: Arc<dyn SchemaSource>,
    pub data: Arc<dyn DataAccess>,
    pub classification: Arc<dyn ClassificationOracle>,
    pub prioritization: Arc<dyn PrioritizationOracle>,
}

/// One column of a viewed table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnView {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub discovered: bool,
    pub sensitivity: SensitivityLabel,
    pub overridden: bool,
}

/// A table's sampled records with per-column effective sensitivity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub table: Table,
    pub count: TableCount,
    /// Data columns in first-seen order, then schema columns without data
    pub columns: Vec<ColumnView>,
    pub rows: Vec<SampleRow>,
    pub classification_failed: bool,
}

struct ClassifiedTable {
    labels: ColumnLabels,
    discovered: Vec<String>,
}

fn superseded(session_id: Uuid) -> AppSurveyorError {
    AppSurveyorError::SessionSuperseded {
        session_id: session_id.to_string(),
    }
}

fn no_session() -> AppSurveyorError {
    AppSurveyorError::configuration("No active scan session; discover tables first")
}

/// Applies one table's classification outcome to the session.
fn apply_outcome(session: &mut ScanSession, table_id: &str, outcome: Result<ClassifiedTable>) {
    match outcome {
        Ok(classified) => {
            if let Some(table) = session.table_mut(table_id) {
                let added = table.add_discovered_columns(classified.discovered.iter().map(String::as_str));
                if added > 0 {
                    debug!("Discovered {} new columns in table '{}'", added, table_id);
                }
            }
            session.ledger.record_classification(table_id, classified.labels);
        }
        Err(e) => {
            warn!("Sensitivity scan degraded for table '{}': {}", table_id, e);
            session.warnings.push(format!("Table '{}': {}", table_id, e));
            session.ledger.record_failure(table_id, e.to_string());
        }
    }
    session.in_flight.remove(table_id);
    session.sync_sensitivity(table_id);
}

fn column_views(table: &Table, data_columns: &[String], ledger: &SensitivityLedger) -> Vec<ColumnView> {
    let ordered = data_columns.iter().chain(
        table
            .columns
            .iter()
            .map(|c| &c.name)
            .filter(|name| !data_columns.contains(name)),
    );

    ordered
        .map(|name| {
            let column = table.columns.iter().find(|c| &c.name == name);
            ColumnView {
                name: name.clone(),
                column_type: column.map_or_else(|| "unknown".to_string(), |c| c.column_type.clone()),
                discovered: column.is_none_or(|c| c.discovered),
                sensitivity: ledger.effective_sensitivity(&table.id, name),
                overridden: ledger.overrides().get(&table.id, name).is_some(),
            }
        })
        .collect()
}

/// Drives discovery, counting, classification, and aggregation.
pub struct ScanOrchestrator {
    collaborators: Collaborators,
    classifier: Classifier,
    config: ScanConfig,
    parser: SchemaParser,
    session: Mutex<Option<ScanSession>>,
    observer: Arc<dyn ScanObserver>,
}

impl ScanOrchestrator {
    /// Creates an orchestrator.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::Configuration` if the config is invalid.
    pub fn new(collaborators: Collaborators, config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let classifier = Classifier::new(collaborators.classification.clone(), config.clone());
        Ok(Self {
            collaborators,
            classifier,
            config,
            parser: SchemaParser::new(),
            session: Mutex::new(None),
            observer: Arc::new(NoopObserver),
        })
    }

    /// Builder method to set the progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Builder method to set the schema parser.
    pub fn with_parser(mut self, parser: SchemaParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn sampler(&self, app: AppInfo) -> Sampler {
        Sampler::new(self.collaborators.data.clone(), app, self.config.clone())
    }

    fn emit(&self, session: &ScanSession) {
        self.observer.on_update(&session.snapshot());
    }

    /// Runs `f` on the session only if it is still `session_id`.
    async fn with_session<T>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut ScanSession) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.session.lock().await;
        match guard.as_mut() {
            Some(session) if session.id() == session_id => f(session),
            _ => Err(superseded(session_id)),
        }
    }

    /// Runs `f` on whatever session is active.
    async fn with_active<T>(&self, f: impl FnOnce(&mut ScanSession) -> Result<T>) -> Result<T> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(no_session)?;
        f(session)
    }

    /// Id of the active session, if any.
    pub async fn session_id(&self) -> Option<Uuid> {
        self.session.lock().await.as_ref().map(ScanSession::id)
    }

    /// Snapshot of the active session, if any.
    pub async fn snapshot(&self) -> Option<ScanSnapshot> {
        self.session.lock().await.as_ref().map(ScanSession::snapshot)
    }

    /// Report of the active session.
    pub async fn report(&self) -> Result<ScanReport> {
        self.with_active(|s| Ok(s.report())).await
    }

    async fn load_tables(&self, origin: &str) -> Result<(AppInfo, Vec<Table>)> {
        let app = self.collaborators.schema.fetch_app_info(origin).await?;
        debug!("Resolved application name '{}'", app.app_name);
        let description = self.collaborators.schema.fetch_schema(origin).await?;
        let tables = self.parser.parse(&description)?;
        Ok((app, tables))
    }

    /// Starts a new scan: discovers tables and counts their records.
    ///
    /// Any previous session is superseded. Counting runs for all tables at
    /// once; a failed count degrades only that table.
    ///
    /// # Errors
    /// Returns the terminal discovery error (the session moves to
    /// `Failed`), or `SessionSuperseded` if a newer scan started meanwhile.
    pub async fn discover_tables(&self, app_url: &str) -> Result<Vec<Table>> {
        let origin = normalize_app_url(app_url)?;

        let mut session = ScanSession::new();
        session.transition(ScanPhase::SchemaLoading)?;
        let session_id = session.id();
        {
            let mut guard = self.session.lock().await;
            if let Some(previous) = guard.as_ref() {
                info!("Scan {} supersedes scan {}", session_id, previous.id());
            }
            *guard = Some(session);
        }
        info!("Discovering tables for {}", redact_url(&origin));

        let (app, mut tables) = match self.load_tables(&origin).await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("Table discovery failed: {}", e);
                let reason = e.to_string();
                let _ = self
                    .with_session(session_id, |s| {
                        s.fail(reason);
                        self.emit(s);
                        Ok(())
                    })
                    .await;
                return Err(e);
            }
        };

        let sampler = self.sampler(app.clone());
        let counts = join_all(tables.iter().map(|table| sampler.count(&table.id))).await;
        for (table, count) in tables.iter_mut().zip(counts) {
            table.count = Some(count);
        }
        sort_for_display(&mut tables);

        let with_data = tables.iter().filter(|t| t.has_real_data()).count();
        info!(
            "Discovered {} tables for '{}', {} with data",
            tables.len(),
            app.app_name,
            with_data
        );

        self.with_session(session_id, |s| {
            for table in &tables {
                if table.count.is_some_and(|c| c.status == EnvelopeStatus::Unavailable) {
                    s.warnings
                        .push(format!("Record count unavailable for table '{}'", table.id));
                }
            }
            s.app = Some(app);
            s.tables = tables.clone();
            s.transition(ScanPhase::TableListReady)?;
            self.emit(s);
            Ok(())
        })
        .await?;

        Ok(tables)
    }

    async fn classify_one(&self, sampler: &Sampler, table: &Table) -> Result<ClassifiedTable> {
        let rows = sampler.sample_rows(&table.id).await?;
        let request = self.classifier.build_request(table, &rows);
        let labels = self.classifier.classify(&request).await?;
        Ok(ClassifiedTable {
            labels,
            discovered: results::data_columns(&rows),
        })
    }

    /// Classifies every table with confirmed data, in batches.
    ///
    /// Tables in a batch run concurrently and a failure inside a batch only
    /// degrades its own table. The exposure summary is refreshed and a
    /// snapshot published after every batch.
    ///
    /// # Errors
    /// Returns `InvalidTransition` unless the table list is ready, or
    /// `SessionSuperseded` if a newer scan started; stale results are
    /// discarded.
    pub async fn scan_sensitivity(&self) -> Result<Option<ExposureSummary>> {
        let batch_size = self.config.batch_size;
        let (session_id, app, eligible) = self
            .with_active(|s| {
                let app = s.app.clone().ok_or_else(no_session)?;
                s.transition(ScanPhase::SensitivityScanning)?;
                let with_data: Vec<Table> =
                    s.tables.iter().filter(|t| t.has_real_data()).cloned().collect();
                let eligible: Vec<Table> = with_data
                    .into_iter()
                    .filter(|t| s.begin_classification(&t.id))
                    .collect();
                s.batches_planned = eligible.len().div_ceil(batch_size);
                self.emit(s);
                Ok((s.id(), app, eligible))
            })
            .await?;

        info!(
            "Classifying {} tables in batches of {}",
            eligible.len(),
            batch_size
        );

        let sampler = &self.sampler(app);
        for (index, batch) in eligible.chunks(batch_size).enumerate() {
            debug!(
                "Starting batch {} with {} tables",
                index.saturating_add(1),
                batch.len()
            );
            let outcomes = join_all(batch.iter().map(|table| async move {
                (table.id.clone(), self.classify_one(sampler, table).await)
            }))
            .await;

            self.with_session(session_id, |s| {
                for (table_id, outcome) in outcomes {
                    apply_outcome(s, &table_id, outcome);
                }
                s.batches_completed = s.batches_completed.saturating_add(1);
                Ok(())
            })
            .await?;

            self.refresh_summary_for(session_id).await?;
            self.with_session(session_id, |s| {
                self.emit(s);
                Ok(())
            })
            .await?;
        }

        if eligible.is_empty() {
            self.refresh_summary_for(session_id).await?;
        }

        self.with_session(session_id, |s| {
            s.transition(ScanPhase::Complete)?;
            info!(
                "Sensitivity scan complete: {} batches, {} high-sensitivity tables",
                s.batches_completed,
                s.tables
                    .iter()
                    .filter(|t| t.sensitivity.as_ref().is_some_and(|r| r.level == SensitivityLabel::High))
                    .count()
            );
            self.emit(s);
            Ok(s.summary.clone())
        })
        .await
    }

    /// Discovers, counts, and classifies an application in one call.
    pub async fn run_scan(&self, app_url: &str) -> Result<ScanReport> {
        self.discover_tables(app_url).await?;
        self.scan_sensitivity().await?;
        self.report().await
    }

    async fn refresh_summary_for(&self, session_id: Uuid) -> Result<Option<ExposureSummary>> {
        let (candidates, current) = self
            .with_session(session_id, |s| {
                let candidates = select_candidates(&s.tables, &s.ledger, &self.config);
                let unchanged = s.summary_inputs.as_ref() == Some(&candidates);
                Ok((candidates, unchanged.then(|| s.summary.clone())))
            })
            .await?;

        if let Some(current) = current {
            debug!("Exposure candidates unchanged; keeping current summary");
            return Ok(current);
        }

        let outcome = build_summary(
            self.collaborators.prioritization.as_ref(),
            &candidates,
            &self.config,
        )
        .await;

        self.with_session(session_id, |s| {
            if select_candidates(&s.tables, &s.ledger, &self.config) != candidates {
                debug!("Exposure candidates changed during ranking; discarding stale summary");
                return Ok(s.summary.clone());
            }
            match outcome {
                Ok(summary) => {
                    debug!("Exposure summary ranks {} tables", summary.tables.len());
                    s.summary = Some(summary);
                }
                Err(e) => {
                    if !candidates.is_empty() {
                        warn!("Exposure summary suppressed: {}", e);
                        s.warnings.push(format!("Exposure summary suppressed: {}", e));
                    }
                    s.summary = None;
                }
            }
            s.summary_inputs = Some(candidates);
            Ok(s.summary.clone())
        })
        .await
    }

    /// Recomputes the exposure summary, e.g. after overrides.
    ///
    /// The oracle is not called when the candidate set is unchanged.
    pub async fn refresh_summary(&self) -> Result<Option<ExposureSummary>> {
        let session_id = self.with_active(|s| Ok(s.id())).await?;
        let summary = self.refresh_summary_for(session_id).await?;
        self.with_session(session_id, |s| {
            self.emit(s);
            Ok(())
        })
        .await?;
        Ok(summary)
    }

    /// Samples a table for viewing and reports per-column sensitivity.
    ///
    /// The table is classified at most once per session; later views reuse
    /// the cached outcome, including a failed one.
    ///
    /// # Errors
    /// Returns `UnknownTable`, a `SampleFetch` error if the listing request
    /// fails, or `SessionSuperseded`.
    pub async fn view_table(&self, table_id: &str) -> Result<TableView> {
        let (session_id, app, table, owns_classification) = self
            .with_active(|s| {
                let table = s.require_table(table_id)?.clone();
                let app = s.app.clone().ok_or_else(no_session)?;
                let owns = s.begin_classification(table_id);
                Ok((s.id(), app, table, owns))
            })
            .await?;

        let listing = match self.sampler(app).listing(table_id).await {
            Ok(listing) => listing,
            Err(e) => {
                if owns_classification {
                    let _ = self
                        .with_session(session_id, |s| {
                            s.in_flight.remove(table_id);
                            Ok(())
                        })
                        .await;
                }
                return Err(e);
            }
        };

        let classification = if owns_classification && listing.count.has_real_data() {
            let limit = usize::try_from(self.config.classification_sample_size)
                .unwrap_or(usize::MAX)
                .min(listing.rows.len());
            let request = self.classifier.build_request(&table, &listing.rows[..limit]);
            Some(self.classifier.classify(&request).await.map(|labels| ClassifiedTable {
                labels,
                discovered: Vec::new(),
            }))
        } else {
            None
        };

        let classified = classification.is_some();
        let (view, scan_started) = self.with_session(session_id, |s| {
            let data_columns = results::data_columns(&listing.rows);
            if let Some(t) = s.table_mut(table_id) {
                t.count = Some(listing.count);
                t.add_discovered_columns(data_columns.iter().map(String::as_str));
            }
            match classification {
                Some(outcome) => apply_outcome(s, table_id, outcome),
                None => {
                    if owns_classification {
                        s.in_flight.remove(table_id);
                    }
                    s.sync_sensitivity(table_id);
                }
            }

            let table = s.require_table(table_id)?.clone();
            let columns = column_views(&table, &data_columns, &s.ledger);
            let classification_failed = matches!(
                s.ledger.classifications().get(table_id),
                Some(CachedClassification::Failed { .. })
            );
            let scan_started = matches!(
                s.phase(),
                ScanPhase::SensitivityScanning | ScanPhase::Complete
            );
            let view = TableView {
                table,
                count: listing.count,
                columns,
                rows: listing.rows,
                classification_failed,
            };
            Ok((view, scan_started))
        })
        .await?;

        // A scan skips tables a view has claimed, so the view owns the
        // summary update for its outcome.
        if classified && scan_started {
            self.refresh_summary_for(session_id).await?;
            self.with_session(session_id, |s| {
                self.emit(s);
                Ok(())
            })
            .await?;
        }
        Ok(view)
    }

    /// Sets a manual override and returns the table's recomputed rollup.
    ///
    /// # Errors
    /// Returns `UnknownTable` for an unknown table and `Configuration` for
    /// a column the table does not have.
    pub async fn set_override(
        &self,
        table_id: &str,
        column: &str,
        label: SensitivityLabel,
    ) -> Result<TableSensitivity> {
        self.with_active(|s| {
            let table = s.require_table(table_id)?;
            let known = table.has_column(column)
                || s.ledger.effective_labels(table_id).contains_key(column);
            if !known {
                return Err(AppSurveyorError::configuration(format!(
                    "Unknown column '{}' in table '{}'",
                    column, table_id
                )));
            }
            let rollup = s.ledger.set_override(table_id, column, label);
            s.sync_sensitivity(table_id);
            info!("Override {}.{} = {}", table_id, column, label);
            self.emit(s);
            Ok(rollup)
        })
        .await
    }

    /// Drops a table's cached classification so the next view reclassifies.
    ///
    /// Overrides are kept. Returns true if a cached outcome existed.
    pub async fn invalidate_classification(&self, table_id: &str) -> Result<bool> {
        self.with_active(|s| {
            s.require_table(table_id)?;
            let existed = s.ledger.clear_classification(table_id);
            s.sync_sensitivity(table_id);
            debug!("Invalidated classification of table '{}'", table_id);
            self.emit(s);
            Ok(existed)
        })
        .await
    }

    /// Effective label of one column in the active session.
    pub async fn effective_sensitivity(
        &self,
        table_id: &str,
        column: &str,
    ) -> Result<SensitivityLabel> {
        self.with_active(|s| {
            s.require_table(table_id)?;
            Ok(s.ledger.effective_sensitivity(table_id, column))
        })
        .await
    }
}
