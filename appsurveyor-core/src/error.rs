//! Error types with token and URL sanitization.
//!
//! Errors are split along the failure boundaries of a scan: schema
//! discovery failures are terminal, everything per table (sampling,
//! classification) degrades only that table, and aggregation failures
//! suppress only the exposure summary. No variant ever carries an access
//! token, API key, or URL query string.

use thiserror::Error;

/// Main error type for AppSurveyor operations.
#[derive(Debug, Error)]
pub enum AppSurveyorError {
    /// The schema description yielded no tables (terminal for the scan)
    #[error("Schema parsing failed: {context}")]
    SchemaParse { context: String },

    /// Sampling or counting a single table failed
    #[error("Sample fetch failed for table '{table}': {context}")]
    SampleFetch {
        table: String,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The classification oracle failed or returned unparsable output
    #[error("Classification failed for table '{table}': {context}")]
    Classification { table: String, context: String },

    /// The prioritization oracle failed or ranked nothing
    #[error("Exposure aggregation failed: {context}")]
    Aggregation { context: String },

    /// HTTP transport failure talking to a collaborator
    #[error("Transport failure: {context}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// A collaborator answered with a non-success status
    #[error("Upstream returned status {status}: {context}")]
    UpstreamStatus { status: u16, context: String },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Illegal scan state-machine transition
    #[error("Invalid scan transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// A newer scan replaced the session this work belonged to
    #[error("Scan session {session_id} was superseded by a newer scan")]
    SessionSuperseded { session_id: String },

    /// No table with this id exists in the active session
    #[error("Unknown table '{table}'")]
    UnknownTable { table: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with AppSurveyorError
pub type Result<T> = std::result::Result<T, AppSurveyorError>;

/// Safely redacts a URL for logging and error messages.
///
/// Passwords are masked and the query string is dropped entirely, since
/// share links carry access tokens as query parameters.
///
/// # Example
///
/// ```rust
/// use appsurveyor_core::error::redact_url;
///
/// let sanitized = redact_url("https://app.example.com/page?x=secret&y=other");
/// assert_eq!(sanitized, "https://app.example.com/page");
/// assert!(!sanitized.contains("secret"));
/// ```
pub fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed_url) => {
            if parsed_url.password().is_some() {
                let _ = parsed_url.set_password(Some("****"));
            }
            parsed_url.set_query(None);
            parsed_url.set_fragment(None);
            parsed_url.to_string()
        }
        Err(_) => "<redacted>".to_string(),
    }
}

impl AppSurveyorError {
    /// Creates a terminal schema parse error
    pub fn schema_parse(context: impl Into<String>) -> Self {
        Self::SchemaParse {
            context: context.into(),
        }
    }

    /// Creates a per-table sample fetch error wrapping the underlying cause
    pub fn sample_failed<E>(table: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let context = error.to_string();
        Self::SampleFetch {
            table: table.into(),
            context,
            source: Box::new(error),
        }
    }

    /// Creates a per-table classification error
    pub fn classification_failed(table: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Classification {
            table: table.into(),
            context: context.into(),
        }
    }

    /// Creates an aggregation error that suppresses the exposure summary
    pub fn aggregation_failed(context: impl Into<String>) -> Self {
        Self::Aggregation {
            context: context.into(),
        }
    }

    /// Creates a transport error; the request URL is redacted first
    pub fn transport(url: &str, error: reqwest::Error) -> Self {
        Self::Transport {
            context: format!("Request to {} failed", redact_url(url)),
            source: error.without_url(),
        }
    }

    /// Creates an upstream status error; the request URL is redacted first
    pub fn upstream_status(status: u16, url: &str) -> Self {
        Self::UpstreamStatus {
            status,
            context: redact_url(url),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an unknown table error
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable {
            table: table.into(),
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Returns true if this error must abort the whole scan.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::SchemaParse { .. } | Self::Configuration { .. } | Self::InvalidTransition { .. }
        )
    }
}
