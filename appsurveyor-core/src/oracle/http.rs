//! OpenAI-compatible chat-completion oracle.

use super::{ClassificationOracle, ClassificationRequest, PrioritizationOracle, prompt};
use crate::{
    Result,
    config::OracleConfig,
    error::{AppSurveyorError, redact_url},
    models::ExposureCandidate,
};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use zeroize::Zeroizing;

/// Oracle backed by a `POST {base_url}/chat/completions` endpoint.
///
/// Implements both oracle traits; the core parses the returned text.
#[derive(Clone)]
pub struct ChatOracle {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Zeroizing<String>,
}

impl std::fmt::Debug for ChatOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOracle")
            .field("endpoint", &redact_url(&self.endpoint))
            .field("model", &self.model)
            .field("api_key", &"****")
            .finish()
    }
}

impl ChatOracle {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        model: impl Into<String>,
        api_key: Zeroizing<String>,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
        }
    }

    /// Creates an oracle, reading the API key from the configured variable.
    ///
    /// # Errors
    /// Returns `AppSurveyorError::Configuration` if the variable is unset
    /// or empty. The message names the variable, never its value.
    pub fn from_config(client: reqwest::Client, config: &OracleConfig) -> Result<Self> {
        let api_key = Zeroizing::new(std::env::var(&config.api_key_env).unwrap_or_default());
        if api_key.trim().is_empty() {
            return Err(AppSurveyorError::configuration(format!(
                "Oracle API key not set; export {}",
                config.api_key_env
            )));
        }
        Ok(Self::new(client, &config.base_url, config.model.clone(), api_key))
    }

    async fn complete(&self, system: &str, user: String) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        debug!("Calling oracle {} with model {}", redact_url(&self.endpoint), self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppSurveyorError::transport(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppSurveyorError::upstream_status(
                status.as_u16(),
                &self.endpoint,
            ));
        }

        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppSurveyorError::transport(&self.endpoint, e))?;

        reply
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AppSurveyorError::configuration("Oracle reply has no message content")
            })
    }
}

#[async_trait]
impl ClassificationOracle for ChatOracle {
    async fn classify_columns(&self, request: &ClassificationRequest) -> Result<String> {
        self.complete(
            prompt::CLASSIFICATION_SYSTEM,
            prompt::classification_prompt(request),
        )
        .await
    }
}

#[async_trait]
impl PrioritizationOracle for ChatOracle {
    async fn prioritize(&self, candidates: &[ExposureCandidate]) -> Result<String> {
        self.complete(
            prompt::PRIORITIZATION_SYSTEM,
            prompt::prioritization_prompt(candidates),
        )
        .await
    }
}
