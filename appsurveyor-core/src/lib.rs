//! Core data structures and pipeline for AppSurveyor.
//!
//! AppSurveyor discovers the data tables a low-code application backend
//! exposes, samples their records, and classifies which fields carry
//! sensitive personal or business information. The result is a per-table
//! sensitivity rollup plus a ranked cross-table exposure summary.
//!
//! # Security Guarantees
//! - Access tokens and API keys are held in zeroizing containers
//! - Tokens and URL query strings never appear in logs or error messages
//! - Reports are validated for token leakage before they are written
//!
//! # Architecture
//! The pipeline runs leaf-first:
//! - [`schema`] turns a text schema description into [`Table`]s
//! - [`sampler`] fetches counts and samples through a [`DataAccess`] adapter
//! - [`results`] normalizes heterogeneous response envelopes into rows
//! - [`classifier`] asks a classification oracle for per-column labels
//! - [`sensitivity`] merges classifier output with manual overrides
//! - [`orchestrator`] drives everything in bounded concurrent batches

pub mod adapters;
pub mod classifier;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod oracle;
pub mod orchestrator;
pub mod results;
pub mod sampler;
pub mod schema;
pub mod security;
pub mod sensitivity;
pub mod validation;

// Re-export commonly used types
pub use adapters::{DataAccess, DataRequest, SchemaSource};
pub use config::{EndpointConfig, OracleConfig, ScanConfig, SurveyorConfig};
pub use error::{AppSurveyorError, Result};
pub use logging::{LogFormat, init_logging};
pub use models::{
    AppInfo, Column, EnvelopeStatus, ExposureSummary, RankedTable, RecordCount, SampleRow,
    ScanPhase, ScanReport, SensitivityLabel, Table, TableCount, TableSensitivity,
};
pub use oracle::{ClassificationOracle, PrioritizationOracle};
pub use orchestrator::{
    ColumnView, Collaborators, ScanObserver, ScanOrchestrator, ScanSnapshot, TableView,
};
pub use security::AccessTokens;
pub use validation::{ValidationError, initialize_report_validator, validate_report_output};
