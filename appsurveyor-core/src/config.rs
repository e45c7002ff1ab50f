//! Scan and endpoint configuration.
//!
//! Every field has a default so a TOML file only needs to name what it
//! changes. CLI flags are layered on top by the collector binary.

use crate::{Result, error::AppSurveyorError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest batch the orchestrator will run concurrently.
pub const MAX_BATCH_SIZE: usize = 32;

/// Tuning knobs for a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Tables classified concurrently per batch
    pub batch_size: usize,
    /// Rows sampled per table for classification
    pub classification_sample_size: u32,
    /// Page size of the counting and viewing request
    pub count_page_size: u32,
    /// Hit count at which a count becomes "at least" when not at end
    pub count_cap: u64,
    /// Distinct example values sent per column
    pub max_examples_per_column: usize,
    /// Example values longer than this are truncated
    pub max_example_chars: usize,
    /// Ranked tables kept in the exposure summary
    pub summary_max_tables: usize,
    /// Columns kept per ranked table
    pub summary_max_columns: usize,
    /// Name tokens that exclude a table from the exposure summary
    pub excluded_name_terms: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            classification_sample_size: 5,
            count_page_size: 10_000,
            count_cap: 400,
            max_examples_per_column: 3,
            max_example_chars: 100,
            summary_max_tables: 4,
            summary_max_columns: 5,
            excluded_name_terms: ["test", "tests", "sample", "samples", "dummy", "demo"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ScanConfig {
    /// Creates a new scan config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the classification batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Builder method to set the classification sample size.
    pub fn with_classification_sample_size(mut self, size: u32) -> Self {
        self.classification_sample_size = size;
        self
    }

    /// Builder method to set the counting page size and cap.
    pub fn with_count_limits(mut self, page_size: u32, cap: u64) -> Self {
        self.count_page_size = page_size;
        self.count_cap = cap;
        self
    }

    /// Builder method to set the summary limits.
    pub fn with_summary_limits(mut self, max_tables: usize, max_columns: usize) -> Self {
        self.summary_max_tables = max_tables;
        self.summary_max_columns = max_columns;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::Configuration` on out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(AppSurveyorError::configuration(format!(
                "batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        if self.classification_sample_size == 0 || self.count_page_size == 0 {
            return Err(AppSurveyorError::configuration(
                "sample sizes must be greater than zero",
            ));
        }
        if self.count_cap > u64::from(self.count_page_size) {
            return Err(AppSurveyorError::configuration(format!(
                "count_cap ({}) cannot exceed count_page_size ({})",
                self.count_cap, self.count_page_size
            )));
        }
        if self.max_examples_per_column == 0 || self.max_example_chars == 0 {
            return Err(AppSurveyorError::configuration(
                "example limits must be greater than zero",
            ));
        }
        if self.summary_max_tables == 0 || self.summary_max_columns == 0 {
            return Err(AppSurveyorError::configuration(
                "summary limits must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Settings for the OpenAI-compatible oracle endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Collaborator endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of the schema-description service
    pub schema_service_url: String,
    /// URL of the data-access service
    pub data_service_url: String,
    /// Application version requested from the backend
    pub app_version: String,
    /// Optional search path forwarded in data requests
    pub search_path: Option<String>,
    /// Per-request timeout in seconds; none waits indefinitely
    pub request_timeout_secs: Option<u64>,
    pub oracle: OracleConfig,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            schema_service_url: "https://bubble.io".to_string(),
            data_service_url: "http://127.0.0.1:8787/fetch".to_string(),
            app_version: "live".to_string(),
            search_path: None,
            request_timeout_secs: None,
            oracle: OracleConfig::default(),
        }
    }
}

impl EndpointConfig {
    /// Validates that every endpoint is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("schema_service_url", &self.schema_service_url),
            ("data_service_url", &self.data_service_url),
            ("oracle.base_url", &self.oracle.base_url),
        ] {
            let parsed = url::Url::parse(value).map_err(|e| {
                AppSurveyorError::configuration(format!("{} is not a valid URL: {}", field, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppSurveyorError::configuration(format!(
                    "{} must use http or https",
                    field
                )));
            }
        }
        if self.app_version.trim().is_empty() {
            return Err(AppSurveyorError::configuration("app_version cannot be empty"));
        }
        Ok(())
    }
}

/// Complete collector configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyorConfig {
    pub scan: ScanConfig,
    pub endpoints: EndpointConfig,
}

impl SurveyorConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| {
            AppSurveyorError::configuration(format!("Invalid configuration file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AppSurveyorError::Io {
            context: format!("Failed to read configuration file {}", path.display()),
            source: e,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.scan.validate()?;
        self.endpoints.validate()
    }
}
