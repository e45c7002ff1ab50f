//! Access token resolution.
//!
//! Tokens are taken, in order, from explicit arguments (or their
//! environment variables), from a share link's query string, or from a
//! hidden interactive prompt.

use appsurveyor_core::{AccessTokens, AppSurveyorError, Result, security::tokens_from_query};

/// Where the access tokens came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// `--token-x`/`--token-y` or their environment variables
    Arguments,
    /// The query string of a share link
    ShareLink,
    /// Typed at a hidden prompt
    Prompt,
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TokenSource::Arguments => "arguments",
            TokenSource::ShareLink => "share link",
            TokenSource::Prompt => "prompt",
        })
    }
}

/// Resolves the access token pair.
///
/// # Errors
/// Returns `AppSurveyorError::Configuration` when tokens are malformed, when
/// only one of the pair is given, or when none are available and prompting
/// is disabled. Messages never include token values.
pub fn resolve_tokens(
    token_x: Option<String>,
    token_y: Option<String>,
    share_link: Option<&str>,
    allow_prompt: bool,
) -> Result<(AccessTokens, TokenSource)> {
    match (token_x, token_y) {
        (Some(x), Some(y)) => return Ok((AccessTokens::new(x, y)?, TokenSource::Arguments)),
        (Some(_), None) | (None, Some(_)) => {
            return Err(AppSurveyorError::configuration(
                "Both access tokens are required; only one was given",
            ));
        }
        (None, None) => {}
    }

    if let Some(link) = share_link {
        return match tokens_from_query(link) {
            Some(tokens) => Ok((tokens?, TokenSource::ShareLink)),
            None => Err(AppSurveyorError::configuration(
                "Share link does not carry both x and y tokens",
            )),
        };
    }

    if !allow_prompt {
        return Err(AppSurveyorError::configuration(
            "Access tokens required. Set APPSURVEYOR_TOKEN_X and APPSURVEYOR_TOKEN_Y, \
             or use --share-link.",
        ));
    }

    let x = prompt_secret("Access token x: ")?;
    let y = prompt_secret("Access token y: ")?;
    Ok((AccessTokens::new(x, y)?, TokenSource::Prompt))
}

fn prompt_secret(prompt: &str) -> Result<String> {
    rpassword::prompt_password(prompt).map_err(|e| AppSurveyorError::Io {
        context: "Failed to read access token".to_string(),
        source: e,
    })
}
