//! Secure container for the data-access authorization tokens.
//!
//! The data-access service requires two opaque tokens (`x` and `y`) with
//! every request. They are held in `Zeroizing` containers, validated as
//! base64, and never printed.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use zeroize::{Zeroize, Zeroizing};

use crate::{Result, error::AppSurveyorError};

/// Standard alphabet, padding optional, trailing bits tolerated.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// The pair of opaque access tokens sent to the data-access service.
///
/// # Example
///
/// ```rust
/// use appsurveyor_core::security::AccessTokens;
///
/// let tokens = AccessTokens::new("p1w5CLCS+ngw".to_string(), "izOe/w==".to_string())?;
/// assert_eq!(tokens.x(), "p1w5CLCS+ngw");
/// assert!(!format!("{:?}", tokens).contains("p1w5"));
/// # Ok::<(), appsurveyor_core::AppSurveyorError>(())
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct AccessTokens {
    x: Zeroizing<String>,
    y: Zeroizing<String>,
}

impl AccessTokens {
    /// Creates a validated token pair.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::Configuration` if either token is empty or
    /// not base64. The message never includes the token value.
    pub fn new(x: String, y: String) -> Result<Self> {
        let tokens = Self {
            x: Zeroizing::new(x.trim().to_string()),
            y: Zeroizing::new(y.trim().to_string()),
        };
        validate_token("x", &tokens.x)?;
        validate_token("y", &tokens.y)?;
        Ok(tokens)
    }

    /// The first token.
    pub fn x(&self) -> &str {
        &self.x
    }

    /// The second token.
    pub fn y(&self) -> &str {
        &self.y
    }

    /// Both token values, for leak checks on output.
    pub fn secrets(&self) -> [&str; 2] {
        [self.x(), self.y()]
    }
}

impl std::fmt::Debug for AccessTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokens")
            .field("x", &"****")
            .field("y", &"****")
            .finish()
    }
}

fn validate_token(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AppSurveyorError::configuration(format!(
            "Access token '{}' is empty",
            name
        )));
    }
    TOKEN_ENGINE.decode(value).map_err(|_| {
        AppSurveyorError::configuration(format!("Access token '{}' is not valid base64", name))
    })?;
    Ok(())
}

/// Extracts `x`/`y` tokens from a share link's query string.
///
/// A literal `+` in the query is kept as `+` rather than decoded to a
/// space, since the tokens are base64. Returns `None` unless both are
/// present.
///
/// # Example
///
/// ```rust
/// use appsurveyor_core::security::tokens_from_query;
///
/// let tokens = tokens_from_query("https://scan.example.com/?x=ab+c/d%3D%3D&y=izOe").unwrap()?;
/// assert_eq!(tokens.x(), "ab+c/d==");
/// # Ok::<(), appsurveyor_core::AppSurveyorError>(())
/// ```
pub fn tokens_from_query(link: &str) -> Option<Result<AccessTokens>> {
    let query = match link.split_once('?') {
        Some((_, rest)) => rest.split('#').next().unwrap_or_default(),
        None => return None,
    };

    let preserved = query.replace('+', "%2B");
    let mut x = None;
    let mut y = None;
    for (key, value) in url::form_urlencoded::parse(preserved.as_bytes()) {
        match key.as_ref() {
            "x" => x = Some(value.into_owned()),
            "y" => y = Some(value.into_owned()),
            _ => {}
        }
    }

    match (x, y) {
        (Some(x), Some(y)) => Some(AccessTokens::new(x, y)),
        _ => None,
    }
}
