//! Table sampling and record counting through the data-access service.
//!
//! Two request shapes are used: a small sample for classification and a
//! large page for counting and viewing. Counting never fails; any
//! transport or decoding problem becomes an unknown count.

use crate::{
    Result,
    adapters::{DataAccess, DataRequest},
    config::ScanConfig,
    error::AppSurveyorError,
    models::{AppInfo, EnvelopeStatus, RecordCount, SampleRow, TableCount},
    results,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reserved type string of the built-in user table.
pub const USER_TABLE_TYPE: &str = "user";

/// Prefix of every custom table type.
pub const CUSTOM_TYPE_PREFIX: &str = "custom.";

/// Maps a table identifier to its data-access type qualifier.
///
/// # Example
/// ```rust
/// use appsurveyor_core::sampler::table_type;
///
/// assert_eq!(table_type("User"), "user");
/// assert_eq!(table_type("orders"), "custom.orders");
/// ```
pub fn table_type(table_id: &str) -> String {
    if table_id.eq_ignore_ascii_case(USER_TABLE_TYPE) {
        USER_TABLE_TYPE.to_string()
    } else {
        format!("{}{}", CUSTOM_TYPE_PREFIX, table_id)
    }
}

/// Derives a table's count from a raw counting response.
///
/// Error-status envelopes count as zero but are flagged so they never
/// qualify as confirmed data. When the number of rows reaches `cap` and
/// the upstream explicitly reports it is not at the end, the count is a
/// lower bound.
pub fn count_from_response(raw: &serde_json::Value, cap: u64) -> TableCount {
    if let Some(status) = results::error_status(raw) {
        return TableCount {
            count: RecordCount::Exact(0),
            metadata_only: false,
            status: EnvelopeStatus::ErrorStatus { status },
        };
    }

    let rows = results::normalize(raw);
    let hits = u64::try_from(rows.len()).unwrap_or(u64::MAX);
    let not_at_end = results::search_envelope(raw).is_some_and(|env| env.at_end == Some(false));

    let count = if hits >= cap && not_at_end {
        RecordCount::AtLeast(hits)
    } else {
        RecordCount::Exact(hits)
    };

    TableCount {
        count,
        metadata_only: results::is_metadata_only(&rows),
        status: EnvelopeStatus::Success,
    }
}

/// Outcome of the large listing request for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableListing {
    pub count: TableCount,
    pub rows: Vec<SampleRow>,
}

/// Fetches samples and counts for one application.
#[derive(Clone)]
pub struct Sampler {
    access: Arc<dyn DataAccess>,
    app: AppInfo,
    config: ScanConfig,
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("app", &self.app)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Sampler {
    pub fn new(access: Arc<dyn DataAccess>, app: AppInfo, config: ScanConfig) -> Self {
        Self { access, app, config }
    }

    fn request(&self, table_id: &str, size: u32) -> DataRequest {
        DataRequest {
            app: self.app.clone(),
            table_type: table_type(table_id),
            page_size: size,
            offset: 0,
        }
    }

    /// Fetches the raw response for `size` records of a table.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::SampleFetch` wrapping the transport error.
    pub async fn sample(&self, table_id: &str, size: u32) -> Result<serde_json::Value> {
        let request = self.request(table_id, size);
        self.access
            .fetch(&request)
            .await
            .map_err(|e| AppSurveyorError::sample_failed(table_id, e))
    }

    /// Fetches and normalizes the classification sample of a table.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::SampleFetch` on transport failure or an
    /// error-status envelope.
    pub async fn sample_rows(&self, table_id: &str) -> Result<Vec<SampleRow>> {
        let raw = self
            .sample(table_id, self.config.classification_sample_size)
            .await?;

        if let Some(status) = results::error_status(&raw) {
            return Err(AppSurveyorError::sample_failed(
                table_id,
                AppSurveyorError::UpstreamStatus {
                    status,
                    context: "error-status envelope".to_string(),
                },
            ));
        }

        let rows = results::normalize(&raw);
        debug!("Sampled {} rows from table '{}'", rows.len(), table_id);
        Ok(rows)
    }

    /// Fetches the large listing page of a table with its rows.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::SampleFetch` on transport failure.
    pub async fn listing(&self, table_id: &str) -> Result<TableListing> {
        let raw = self.sample(table_id, self.config.count_page_size).await?;
        let count = count_from_response(&raw, self.config.count_cap);
        let rows = if count.status == EnvelopeStatus::Success {
            results::normalize(&raw)
        } else {
            Vec::new()
        };
        Ok(TableListing { count, rows })
    }

    /// Counts a table's records. Never fails.
    pub async fn count(&self, table_id: &str) -> TableCount {
        match self.sample(table_id, self.config.count_page_size).await {
            Ok(raw) => {
                let count = count_from_response(&raw, self.config.count_cap);
                debug!("Table '{}' count: {}", table_id, count.count);
                count
            }
            Err(e) => {
                warn!("Count unavailable for table '{}': {}", table_id, e);
                TableCount::unavailable()
            }
        }
    }
}
