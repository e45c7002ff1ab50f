//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use appsurveyor_core::{
    AppInfo, AppSurveyorError, ClassificationOracle, Collaborators, DataAccess, DataRequest,
    PrioritizationOracle, Result, ScanConfig, ScanObserver, ScanOrchestrator, ScanPhase,
    ScanSnapshot, SchemaSource,
    models::ExposureCandidate,
    oracle::ClassificationRequest,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

pub const APP_URL: &str = "https://shop.example.com";

/// Schema service returning a fixed description.
pub struct StaticSchema {
    pub description: String,
    pub app_name: String,
    pub fail: bool,
}

impl StaticSchema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            app_name: "shop".to_string(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }
}

#[async_trait]
impl SchemaSource for StaticSchema {
    async fn fetch_schema(&self, _app_url: &str) -> Result<String> {
        if self.fail {
            return Err(AppSurveyorError::UpstreamStatus {
                status: 503,
                context: "schema service unavailable".to_string(),
            });
        }
        Ok(self.description.clone())
    }

    async fn fetch_app_info(&self, app_url: &str) -> Result<AppInfo> {
        Ok(AppInfo {
            app_url: app_url.to_string(),
            app_name: self.app_name.clone(),
        })
    }
}

/// Data-access service backed by per-table fixture rows.
#[derive(Default)]
pub struct FixtureData {
    rows: HashMap<String, Vec<Value>>,
    raw: HashMap<String, Value>,
    broken: HashSet<String>,
    pub requests: Mutex<Vec<DataRequest>>,
}

impl FixtureData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `rows` as the `_source` of search hits for a table type.
    pub fn with_rows(mut self, table_type: &str, rows: Vec<Value>) -> Self {
        self.rows.insert(table_type.to_string(), rows);
        self
    }

    /// Serves a fixed raw envelope for a table type.
    pub fn with_raw(mut self, table_type: &str, raw: Value) -> Self {
        self.raw.insert(table_type.to_string(), raw);
        self
    }

    /// Fails every request for a table type at the transport level.
    pub fn with_broken(mut self, table_type: &str) -> Self {
        self.broken.insert(table_type.to_string());
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl DataAccess for FixtureData {
    async fn fetch(&self, request: &DataRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());

        if self.broken.contains(&request.table_type) {
            return Err(AppSurveyorError::UpstreamStatus {
                status: 502,
                context: "data service unavailable".to_string(),
            });
        }
        if let Some(raw) = self.raw.get(&request.table_type) {
            return Ok(raw.clone());
        }

        let rows = self.rows.get(&request.table_type).cloned().unwrap_or_default();
        let page = request.page_size as usize;
        let at_end = rows.len() <= page;
        let hits: Vec<Value> = rows
            .into_iter()
            .take(page)
            .enumerate()
            .map(|(i, source)| json!({"_id": format!("{}", i), "_type": request.table_type, "_source": source}))
            .collect();
        Ok(json!({"body": {"hits": {"hits": hits}, "at_end": at_end}}))
    }
}

/// Blocks classification calls until released.
pub struct Gate {
    pub entered: Notify,
    pub release: Semaphore,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
        })
    }

    pub fn open(&self) {
        self.release.add_permits(1_000);
    }
}

/// Labels columns by name keyword and counts calls per table.
#[derive(Default)]
pub struct KeywordOracle {
    pub calls: AtomicUsize,
    per_table: Mutex<HashMap<String, usize>>,
    failing: HashSet<String>,
    gate: Option<Arc<Gate>>,
    gated_tables: HashSet<String>,
}

impl KeywordOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, table_id: &str) -> Self {
        self.failing.insert(table_id.to_string());
        self
    }

    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Gates only the named table; other tables classify immediately.
    pub fn gated_on(mut self, gate: Arc<Gate>, table_id: &str) -> Self {
        self.gated_tables.insert(table_id.to_string());
        self.gated(gate)
    }

    pub fn calls_for(&self, table_id: &str) -> usize {
        self.per_table
            .lock()
            .unwrap()
            .get(table_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn label_for(column: &str) -> &'static str {
        let lower = column.to_lowercase();
        if ["email", "password", "phone", "ssn"].iter().any(|k| lower.contains(k)) {
            "high"
        } else if ["name", "address", "zip"].iter().any(|k| lower.contains(k)) {
            "moderate"
        } else {
            "low"
        }
    }
}

#[async_trait]
impl ClassificationOracle for KeywordOracle {
    async fn classify_columns(&self, request: &ClassificationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .per_table
            .lock()
            .unwrap()
            .entry(request.table_id.clone())
            .or_insert(0) += 1;

        let gated = self.gated_tables.is_empty() || self.gated_tables.contains(&request.table_id);
        if let Some(gate) = self.gate.as_ref().filter(|_| gated) {
            gate.entered.notify_one();
            gate.release.acquire().await.unwrap().forget();
        }

        if self.failing.contains(&request.table_id) {
            return Err(AppSurveyorError::UpstreamStatus {
                status: 500,
                context: "oracle unavailable".to_string(),
            });
        }

        let fields: Vec<Value> = request
            .column_names()
            .map(|name| json!({"name": name, "sensitivity": Self::label_for(name)}))
            .collect();
        Ok(format!(
            "Classification:\n```json\n{}\n```",
            json!({ "fields": fields })
        ))
    }
}

/// Ranks candidates in the order given and records what it saw.
#[derive(Default)]
pub struct EchoRanker {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Vec<String>>>,
    gate: Option<(usize, Arc<Gate>)>,
}

impl EchoRanker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds the call with the given zero-based index until the gate opens.
    pub fn gated_call(mut self, index: usize, gate: Arc<Gate>) -> Self {
        self.gate = Some((index, gate));
        self
    }
}

#[async_trait]
impl PrioritizationOracle for EchoRanker {
    async fn prioritize(&self, candidates: &[ExposureCandidate]) -> Result<String> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push(candidates.iter().map(|c| c.table_id.clone()).collect());

        if let Some((_, gate)) = self.gate.as_ref().filter(|(gated, _)| *gated == index) {
            gate.entered.notify_one();
            gate.release.acquire().await.unwrap().forget();
        }

        let tables: Vec<Value> = candidates
            .iter()
            .map(|c| {
                json!({
                    "name": c.table_id,
                    "columns": c.columns.iter().map(|col| col.name.clone()).collect::<Vec<_>>()
                })
            })
            .collect();
        Ok(json!({"risk": "Personal data is publicly readable.", "tables": tables}).to_string())
    }
}

/// Observer recording every published snapshot.
#[derive(Default)]
pub struct RecordingObserver {
    pub snapshots: Mutex<Vec<ScanSnapshot>>,
}

impl RecordingObserver {
    pub fn phases(&self) -> Vec<ScanPhase> {
        self.snapshots.lock().unwrap().iter().map(|s| s.phase).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

impl ScanObserver for RecordingObserver {
    fn on_update(&self, snapshot: &ScanSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}

/// A fully wired orchestrator plus handles on its mocks.
pub struct Harness {
    pub orchestrator: ScanOrchestrator,
    pub data: Arc<FixtureData>,
    pub classifier: Arc<KeywordOracle>,
    pub ranker: Arc<EchoRanker>,
    pub observer: Arc<RecordingObserver>,
}

pub fn harness(
    schema: StaticSchema,
    data: FixtureData,
    classifier: KeywordOracle,
    config: ScanConfig,
) -> Harness {
    harness_with_ranker(schema, data, classifier, EchoRanker::new(), config)
}

pub fn harness_with_ranker(
    schema: StaticSchema,
    data: FixtureData,
    classifier: KeywordOracle,
    ranker: EchoRanker,
    config: ScanConfig,
) -> Harness {
    let data = Arc::new(data);
    let classifier = Arc::new(classifier);
    let ranker = Arc::new(ranker);
    let observer = Arc::new(RecordingObserver::default());

    let collaborators = Collaborators {
        schema: Arc::new(schema),
        data: data.clone(),
        classification: classifier.clone(),
        prioritization: ranker.clone(),
    };
    let orchestrator = ScanOrchestrator::new(collaborators, config)
        .unwrap()
        .with_observer(observer.clone());

    Harness {
        orchestrator,
        data,
        classifier,
        ranker,
        observer,
    }
}

/// Schema and data for a small shop application.
///
/// - `users`: email (high) and name (moderate)
/// - `orders`: total and status (low)
/// - `dummy_test`: email (high) but test-named
/// - `empty_logs`: declared, no records
pub fn shop_fixture() -> (StaticSchema, FixtureData) {
    let schema = StaticSchema::new(
        r#"
Table users {
  email text
  name text
}

Table orders {
  total number
  status text
}

Table dummy_test {
  email text
}

Table empty_logs {
  message text
}
"#,
    );

    let data = FixtureData::new()
        .with_rows(
            "custom.users",
            vec![
                json!({"email": "ada@example.com", "name": "Ada", "plan": "pro"}),
                json!({"email": "bob@example.com", "name": "Bob"}),
            ],
        )
        .with_rows(
            "custom.orders",
            vec![json!({"total": 12.5, "status": "paid"}), json!({"total": 3, "status": "open"})],
        )
        .with_rows("custom.dummy_test", vec![json!({"email": "test@example.com"})]);

    (schema, data)
}
