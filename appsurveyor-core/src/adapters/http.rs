//! HTTP implementations of the collaborator traits.
//!
//! # Security
//! - Access tokens are only placed in request bodies, never in URLs
//! - Every URL is passed through `redact_url` before it reaches a log line
//!   or an error message

use super::{DataAccess, DataRequest, SchemaSource, app_name_from_url};
use crate::{
    Result,
    config::EndpointConfig,
    error::{AppSurveyorError, redact_url},
    models::AppInfo,
    security::AccessTokens,
};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Builds the shared HTTP client.
///
/// No timeout is applied unless one is configured.
pub fn build_http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
        "appsurveyor/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(|e| {
        AppSurveyorError::configuration(format!("Failed to build HTTP client: {}", e))
    })
}

/// Schema source backed by a DBML-producing schema service.
#[derive(Debug, Clone)]
pub struct HttpSchemaSource {
    client: reqwest::Client,
    service_url: String,
}

impl HttpSchemaSource {
    pub fn new(client: reqwest::Client, service_url: impl Into<String>) -> Self {
        Self {
            client,
            service_url: service_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Creates a schema source from endpoint configuration.
    pub fn from_config(client: reqwest::Client, config: &EndpointConfig) -> Self {
        Self::new(client, config.schema_service_url.clone())
    }

    fn schema_url(&self, app_url: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(app_url.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        format!("{}/api/schema/{}?format=dbml", self.service_url, encoded)
    }
}

#[async_trait]
impl SchemaSource for HttpSchemaSource {
    async fn fetch_schema(&self, app_url: &str) -> Result<String> {
        let url = self.schema_url(app_url);
        debug!("Fetching schema description from {}", redact_url(&url));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppSurveyorError::transport(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppSurveyorError::upstream_status(status.as_u16(), &url));
        }

        response
            .text()
            .await
            .map_err(|e| AppSurveyorError::transport(&url, e))
    }

    async fn fetch_app_info(&self, app_url: &str) -> Result<AppInfo> {
        let meta_url = format!("{}/api/1.1/meta", app_url.trim_end_matches('/'));
        let fallback = app_name_from_url(app_url);

        let app_name = match self.client.get(&meta_url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<serde_json::Value>().await {
                    Ok(meta) => meta
                        .pointer("/app_data/appname")
                        .and_then(|v| v.as_str())
                        .filter(|name| !name.is_empty())
                        .map(str::to_string),
                    Err(e) => {
                        warn!("Unreadable meta response from {}: {}", redact_url(&meta_url), e.without_url());
                        None
                    }
                }
            }
            Ok(response) => {
                warn!(
                    "Meta endpoint {} returned status {}",
                    redact_url(&meta_url),
                    response.status().as_u16()
                );
                None
            }
            Err(e) => {
                warn!("Meta endpoint {} unreachable: {}", redact_url(&meta_url), e.without_url());
                None
            }
        };

        let app_name = match app_name {
            Some(name) => name,
            None => {
                debug!("Falling back to hostname-derived app name '{}'", fallback);
                fallback
            }
        };

        if app_name.is_empty() {
            return Err(AppSurveyorError::configuration(
                "Could not determine application name",
            ));
        }

        Ok(AppInfo {
            app_url: app_url.to_string(),
            app_name,
        })
    }
}

#[derive(Debug, Serialize)]
struct SearchPayload<'a> {
    app_version: &'a str,
    appname: &'a str,
    constraints: &'a [serde_json::Value],
    from: u64,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_path: Option<&'a str>,
    situation: &'a str,
    sorts_list: &'a [serde_json::Value],
    #[serde(rename = "type")]
    table_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchTableBody<'a> {
    x: &'a str,
    y: &'a str,
    payload: SearchPayload<'a>,
    app_name: &'a str,
    app_url: &'a str,
}

/// Data-access service reached through the fetch-table proxy.
#[derive(Debug, Clone)]
pub struct HttpDataAccess {
    client: reqwest::Client,
    service_url: String,
    tokens: AccessTokens,
    app_version: String,
    search_path: Option<String>,
}

impl HttpDataAccess {
    pub fn new(client: reqwest::Client, service_url: impl Into<String>, tokens: AccessTokens) -> Self {
        Self {
            client,
            service_url: service_url.into(),
            tokens,
            app_version: "live".to_string(),
            search_path: None,
        }
    }

    /// Creates a data-access client from endpoint configuration.
    pub fn from_config(client: reqwest::Client, config: &EndpointConfig, tokens: AccessTokens) -> Self {
        Self::new(client, config.data_service_url.clone(), tokens)
            .with_app_version(config.app_version.clone())
            .with_search_path(config.search_path.clone())
    }

    /// Builder method to set the requested application version.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    /// Builder method to set the forwarded search path.
    pub fn with_search_path(mut self, search_path: Option<String>) -> Self {
        self.search_path = search_path;
        self
    }
}

#[async_trait]
impl DataAccess for HttpDataAccess {
    async fn fetch(&self, request: &DataRequest) -> Result<serde_json::Value> {
        let body = FetchTableBody {
            x: self.tokens.x(),
            y: self.tokens.y(),
            payload: SearchPayload {
                app_version: &self.app_version,
                appname: &request.app.app_name,
                constraints: &[],
                from: request.offset,
                n: request.page_size,
                search_path: self.search_path.as_deref(),
                situation: "initial search",
                sorts_list: &[],
                table_type: &request.table_type,
            },
            app_name: &request.app.app_name,
            app_url: &request.app.app_url,
        };

        debug!(
            "Requesting {} records of type '{}' from {}",
            request.page_size,
            request.table_type,
            redact_url(&self.service_url)
        );

        let response = self
            .client
            .post(&self.service_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppSurveyorError::transport(&self.service_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppSurveyorError::upstream_status(
                status.as_u16(),
                &self.service_url,
            ));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| AppSurveyorError::transport(&self.service_url, e))
    }
}
