//! HTTP client for the upstream fleet (DCH) and Platform APIs.
//!
//! Every request goes through [`UpstreamClient::get_json`], which applies the
//! retry policy: authentication failures, timeouts, and transport errors are
//! retried up to `max_retry_attempts` times, while other HTTP errors fail
//! immediately. Non-JSON success bodies are wrapped as `{"data": "<text>"}`.

use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::{AppConfig, MCP_SERVICE_HEADER_VALUE, SERVICE_VERSION, USER_AGENT};

const X_MCP_SERVICE: HeaderName = HeaderName::from_static("x-mcp-service");
const X_MCP_VERSION: HeaderName = HeaderName::from_static("x-mcp-version");

/// Which upstream API a request targets. Determines the headers sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    Dch,
    Platform,
}

impl std::fmt::Display for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Api::Dch => write!(f, "dch"),
            Api::Platform => write!(f, "platform"),
        }
    }
}

/// Upstream request failure. The display text is returned to MCP clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("Authentication failed after all retry attempts")]
    Unauthorized,

    #[error("API request failed: {0}")]
    Status(u16),

    #[error("Request timeout after all retry attempts")]
    Timeout,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Max retry attempts exceeded")]
    RetriesExhausted,

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

/// Shared client for upstream API calls.
///
/// Cheap to clone; the inner `reqwest::Client` holds the connection pool.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    dch_api_url: String,
    platform_api_url: String,
    dch_headers: HeaderMap,
    platform_headers: HeaderMap,
    max_retry_attempts: u32,
}

impl UpstreamClient {
    pub fn new(config: &AppConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.upstream.request_timeout_seconds))
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            dch_api_url: config.upstream.dch_api_url.clone(),
            platform_api_url: config.upstream.platform_api_url.clone(),
            dch_headers: dch_headers(&config.auth.dch_api_token)?,
            platform_headers: platform_headers(&config.auth.platform_api_token)?,
            max_retry_attempts: config.upstream.max_retry_attempts,
        })
    }

    /// Base URL for the given API, without a trailing slash.
    pub fn base_url(&self, api: Api) -> &str {
        match api {
            Api::Dch => &self.dch_api_url,
            Api::Platform => &self.platform_api_url,
        }
    }

    fn headers(&self, api: Api) -> &HeaderMap {
        match api {
            Api::Dch => &self.dch_headers,
            Api::Platform => &self.platform_headers,
        }
    }

    /// GET `path` (relative to the API base URL) with the given query pairs.
    pub async fn get_json(
        &self,
        api: Api,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}{}", self.base_url(api), path);
        let attempts = self.max_retry_attempts;

        for attempt in 1..=attempts {
            let last = attempt == attempts;
            let result = self
                .http
                .get(&url)
                .headers(self.headers(api).clone())
                .query(query)
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    tracing::error!(%url, attempt, "Upstream request timed out");
                    if last {
                        return Err(UpstreamError::Timeout);
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!(%url, attempt, error = %e, "Upstream request error");
                    if last {
                        return Err(UpstreamError::Transport(e.to_string()));
                    }
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                tracing::warn!(%url, attempt, "Upstream authentication failed");
                if last {
                    return Err(UpstreamError::Unauthorized);
                }
                continue;
            }

            if status.is_client_error() || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(%url, status = status.as_u16(), body = %body, "Upstream request failed");
                return Err(UpstreamError::Status(status.as_u16()));
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) if e.is_timeout() => {
                    tracing::error!(%url, attempt, "Upstream body read timed out");
                    if last {
                        return Err(UpstreamError::Timeout);
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!(%url, attempt, error = %e, "Upstream body read error");
                    if last {
                        return Err(UpstreamError::Transport(e.to_string()));
                    }
                    continue;
                }
            };

            return Ok(parse_body(text));
        }

        Err(UpstreamError::RetriesExhausted)
    }
}

/// JSON bodies are returned as-is; anything else is wrapped under `data`.
fn parse_body(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => serde_json::json!({ "data": text }),
    }
}

/// The DCH API takes the raw token, without a `Bearer` prefix.
fn dch_headers(token: &str) -> Result<HeaderMap, UpstreamError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(AUTHORIZATION, sensitive_value(token)?);
    Ok(headers)
}

fn platform_headers(token: &str) -> Result<HeaderMap, UpstreamError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(AUTHORIZATION, sensitive_value(token)?);
    headers.insert(X_MCP_SERVICE, HeaderValue::from_static(MCP_SERVICE_HEADER_VALUE));
    headers.insert(X_MCP_VERSION, HeaderValue::from_static(SERVICE_VERSION));
    Ok(headers)
}

fn sensitive_value(token: &str) -> Result<HeaderValue, UpstreamError> {
    let mut value = HeaderValue::from_str(token)
        .map_err(|_| UpstreamError::InvalidHeader("authorization".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}
