//! Collaborator traits for schema discovery and data access.
//!
//! The core never talks to the network directly. It consumes a
//! [`SchemaSource`] that returns a text schema description and a
//! [`DataAccess`] service that returns row-bearing envelopes. HTTP
//! implementations live in [`http`]; tests substitute in-memory ones.
//!
//! # Object Safety
//! Both traits are object-safe and used through `Arc<dyn ...>`.

use crate::{Result, error::AppSurveyorError, models::AppInfo};
use async_trait::async_trait;

pub mod http;

pub use http::{HttpDataAccess, HttpSchemaSource, build_http_client};

/// Source of a target application's schema description.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Fetches the raw text schema description for an application.
    ///
    /// # Errors
    /// Returns a transport or upstream-status error; the caller treats
    /// either as a terminal discovery failure.
    async fn fetch_schema(&self, app_url: &str) -> Result<String>;

    /// Resolves the backend application name.
    ///
    /// Implementations should fall back to [`app_name_from_url`] rather
    /// than fail.
    async fn fetch_app_info(&self, app_url: &str) -> Result<AppInfo>;
}

/// One page request against the data-access service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    pub app: AppInfo,
    /// Table-type qualifier, see [`crate::sampler::table_type`]
    pub table_type: String,
    pub page_size: u32,
    pub offset: u64,
}

/// Opaque data-access service.
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// Fetches one page of records.
    ///
    /// An error-status envelope is a successful return; only transport
    /// and decoding failures are errors.
    async fn fetch(&self, request: &DataRequest) -> Result<serde_json::Value>;
}

/// Normalizes user input into an application origin.
///
/// Prepends `https://` when no scheme is given and drops path, query,
/// and fragment.
///
/// # Errors
/// Returns `AppSurveyorError::Configuration` for empty or unparsable input.
///
/// # Example
/// ```rust
/// use appsurveyor_core::adapters::normalize_app_url;
///
/// let origin = normalize_app_url("myapp.bubbleapps.io/version-test?debug_mode=true")?;
/// assert_eq!(origin, "https://myapp.bubbleapps.io");
/// # Ok::<(), appsurveyor_core::AppSurveyorError>(())
/// ```
pub fn normalize_app_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppSurveyorError::configuration("Application URL is empty"));
    }

    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = url::Url::parse(&with_scheme).map_err(|e| {
        AppSurveyorError::configuration(format!("Invalid application URL: {}", e))
    })?;
    if parsed.host_str().is_none() {
        return Err(AppSurveyorError::configuration(
            "Application URL has no host",
        ));
    }

    Ok(parsed.origin().ascii_serialization())
}

/// Derives an application name from the first hostname label.
///
/// # Example
/// ```rust
/// use appsurveyor_core::adapters::app_name_from_url;
///
/// assert_eq!(app_name_from_url("https://myapp.bubbleapps.io"), "myapp");
/// ```
pub fn app_name_from_url(app_url: &str) -> String {
    url::Url::parse(app_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .and_then(|host| host.split('.').next().map(str::to_string))
        .unwrap_or_default()
}
