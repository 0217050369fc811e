//! Raw JSON fetching for the API viewer.
//!
//! Unlike the typed [`crate::upstream`] client, this fetches an arbitrary URL
//! (normally a `generate_report` URL shown to the user) and returns whatever
//! JSON it serves. Requests time out after [`DEFAULT_FETCH_TIMEOUT`].

use std::time::Duration;

use axum::http::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure class of a URL fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchErrorCode {
    InvalidUrl,
    Timeout,
    Network,
    JsonParse,
    NotFound,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct UrlFetchError {
    pub message: String,
    pub code: FetchErrorCode,
    pub status: Option<u16>,
}

impl UrlFetchError {
    fn new(message: impl Into<String>, code: FetchErrorCode) -> Self {
        Self {
            message: message.into(),
            code,
            status: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.code {
            FetchErrorCode::InvalidUrl => StatusCode::BAD_REQUEST,
            FetchErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            FetchErrorCode::NotFound => StatusCode::NOT_FOUND,
            FetchErrorCode::Network | FetchErrorCode::JsonParse => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Fetches JSON documents with a timeout, optionally pinned to one host.
#[derive(Clone)]
pub struct UrlFetcher {
    client: reqwest::Client,
    timeout: Duration,
    allowed_host: Option<String>,
}

impl Default for UrlFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl UrlFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
            allowed_host: None,
        }
    }

    /// Only allow URLs whose host matches `host`.
    pub fn restrict_to_host(mut self, host: &str) -> Self {
        self.allowed_host = Some(host.to_ascii_lowercase());
        self
    }

    /// Validate and normalize a URL string.
    pub fn validate_url(&self, url: &str) -> Result<reqwest::Url, UrlFetchError> {
        if url.trim().is_empty() {
            return Err(UrlFetchError::new("Invalid or missing URL", FetchErrorCode::InvalidUrl));
        }
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|_| UrlFetchError::new("Invalid URL format", FetchErrorCode::InvalidUrl))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UrlFetchError::new("Invalid URL format", FetchErrorCode::InvalidUrl));
        }
        if let Some(allowed) = &self.allowed_host {
            let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
            if &host != allowed {
                return Err(UrlFetchError::new(
                    format!("URL host '{host}' is not allowed"),
                    FetchErrorCode::InvalidUrl,
                ));
            }
        }
        Ok(parsed)
    }

    /// Fetch `url` and parse the body as JSON.
    pub async fn fetch_json(&self, url: &str) -> Result<Value, UrlFetchError> {
        let url = self.validate_url(url)?;
        debug!(host = url.host_str().unwrap_or_default(), "Fetching URL data");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let code = if status == reqwest::StatusCode::NOT_FOUND {
                FetchErrorCode::NotFound
            } else {
                FetchErrorCode::Network
            };
            warn!(status = status.as_u16(), "URL fetch returned an error status");
            return Err(UrlFetchError {
                message: format!("HTTP error! status: {}", status.as_u16()),
                code,
                status: Some(status.as_u16()),
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        if !is_json {
            return Err(UrlFetchError::new("Response is not JSON", FetchErrorCode::JsonParse));
        }

        let body = response.bytes().await.map_err(classify)?;
        serde_json::from_slice(&body)
            .map_err(|_| UrlFetchError::new("Invalid JSON response", FetchErrorCode::JsonParse))
    }
}

fn classify(e: reqwest::Error) -> UrlFetchError {
    if e.is_timeout() {
        UrlFetchError::new("Request timeout", FetchErrorCode::Timeout)
    } else {
        UrlFetchError::new("Network error", FetchErrorCode::Network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_rejects_garbage() {
        let fetcher = UrlFetcher::default();

        let err = fetcher.validate_url("").unwrap_err();
        assert_eq!(err.code, FetchErrorCode::InvalidUrl);
        assert_eq!(err.message, "Invalid or missing URL");

        let err = fetcher.validate_url("not a url").unwrap_err();
        assert_eq!(err.message, "Invalid URL format");

        let err = fetcher.validate_url("ftp://example.com/x").unwrap_err();
        assert_eq!(err.code, FetchErrorCode::InvalidUrl);
    }

    #[test]
    fn test_validate_url_host_restriction() {
        let fetcher = UrlFetcher::default().restrict_to_host("track.onepointgps.com");

        assert!(fetcher
            .validate_url("https://track.onepointgps.com/api/generate_report?x=1")
            .is_ok());
        assert!(fetcher.validate_url("https://evil.example.com/").is_err());
    }

    #[test]
    fn test_error_status_mapping() {
        let err = UrlFetchError::new("Request timeout", FetchErrorCode::Timeout);
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }
}
