//! Security utilities for token protection.
//!
//! This module provides:
//! - A zeroizing container for the data-access tokens
//! - Share-link parsing that extracts tokens without mangling base64
//! - Redaction helpers for logs and diagnostics
//!
//! # Security Guarantees
//! - Tokens are stored in `Zeroizing` containers for automatic memory clearing
//! - Tokens never appear in `Debug` output, logs, or error messages

mod credentials;

pub use credentials::{AccessTokens, tokens_from_query};

/// Masks a secret for display, keeping only its length.
///
/// # Example
///
/// ```rust
/// use appsurveyor_core::security::redact_token;
///
/// assert_eq!(redact_token("c2VjcmV0"), "<8 chars>");
/// assert_eq!(redact_token(""), "<empty>");
/// ```
pub fn redact_token(token: &str) -> String {
    if token.is_empty() {
        "<empty>".to_string()
    } else {
        format!("<{} chars>", token.chars().count())
    }
}
