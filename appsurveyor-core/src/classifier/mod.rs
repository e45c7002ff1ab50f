//! Per-column sensitivity classification.
//!
//! The [`Classifier`] turns a table's sampled rows into a classification
//! request, asks the oracle, and parses the answer into [`ColumnLabels`].
//! Caching is the caller's concern; see [`cache::ClassificationCache`].

pub mod cache;
pub mod samples;

pub use cache::{CachedClassification, ClassificationCache};

use crate::{
    Result,
    config::ScanConfig,
    error::AppSurveyorError,
    models::{ColumnLabels, SampleRow, SensitivityLabel, Table, is_reserved_key},
    oracle::{self, ClassificationOracle, ClassificationRequest, ColumnSamples},
    results,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Classifies table columns through a classification oracle.
#[derive(Clone)]
pub struct Classifier {
    oracle: Arc<dyn ClassificationOracle>,
    config: ScanConfig,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Classifier {
    pub fn new(oracle: Arc<dyn ClassificationOracle>, config: ScanConfig) -> Self {
        Self { oracle, config }
    }

    /// Builds the oracle request for a table from its sampled rows.
    ///
    /// Columns are the table's known columns followed by any first seen in
    /// the rows. Reserved metadata keys are never included.
    pub fn build_request(&self, table: &Table, rows: &[SampleRow]) -> ClassificationRequest {
        let mut names: Vec<String> = table
            .columns
            .iter()
            .map(|c| c.name.clone())
            .filter(|name| !is_reserved_key(name))
            .collect();
        for name in results::data_columns(rows) {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let examples = samples::collect_examples(
                    rows,
                    &name,
                    self.config.max_examples_per_column,
                    self.config.max_example_chars,
                );
                ColumnSamples { name, examples }
            })
            .collect();

        ClassificationRequest {
            table_id: table.id.clone(),
            display_name: table.display_name.clone(),
            columns,
        }
    }

    /// Classifies the columns of a request.
    ///
    /// A request without columns is answered locally with no labels.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::Classification` if the oracle fails or its
    /// answer cannot be parsed.
    pub async fn classify(&self, request: &ClassificationRequest) -> Result<ColumnLabels> {
        if request.columns.is_empty() {
            debug!("Table '{}' has no columns to classify", request.table_id);
            return Ok(ColumnLabels::new());
        }

        let answer = self
            .oracle
            .classify_columns(request)
            .await
            .map_err(|e| AppSurveyorError::classification_failed(&request.table_id, e.to_string()))?;

        parse_response(request, &answer)
    }
}

/// Parses an oracle answer into labels for the requested columns.
///
/// Requested columns absent from the answer are `low`. Columns the oracle
/// invented are ignored, as are unrecognized labels.
///
/// # Errors
/// Returns `AppSurveyorError::Classification` if no payload can be parsed.
pub fn parse_response(request: &ClassificationRequest, answer: &str) -> Result<ColumnLabels> {
    let payload = oracle::parse_classification(answer)
        .map_err(|e| AppSurveyorError::classification_failed(&request.table_id, e.to_string()))?;

    let mut labels: ColumnLabels = request
        .column_names()
        .map(|name| (name.to_string(), SensitivityLabel::Low))
        .collect();

    for field in payload.fields {
        let Some(slot) = labels.get_mut(&field.name) else {
            debug!(
                "Ignoring unrequested column '{}' for table '{}'",
                field.name, request.table_id
            );
            continue;
        };
        match SensitivityLabel::parse(&field.sensitivity) {
            Some(label) => *slot = label,
            None => warn!(
                "Unrecognized sensitivity '{}' for {}.{}; treating as low",
                field.sensitivity, request.table_id, field.name
            ),
        }
    }

    Ok(labels)
}
