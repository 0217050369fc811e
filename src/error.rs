//! Error types shared by the telemetry core and the HTTP layer.
//!
//! Every failure is terminal for the operation that raised it. Nothing in this
//! crate retries; the caller has to trigger a new action.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::fetcher::UrlFetchError;

/// Largest number of raw sensor entries a single report may carry.
pub const MAX_REPORT_ENTRIES: usize = 50_000;

/// Main error type for fleetview.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Bad input rejected at the boundary (bad URL, bad datetime, bad format).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Non-2xx answer, network failure or malformed body from the tracking API.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// The report carries more entries than [`MAX_REPORT_ENTRIES`].
    #[error(
        "Large dataset detected ({} records). Please reduce the time range or interval.",
        format_count(.total)
    )]
    DatasetTooLarge { total: usize },

    /// A static asset (logo, font) could not be loaded.
    #[error("Failed to load asset: {0}")]
    AssetLoad(String),

    /// Rendering or encoding a report artifact failed.
    #[error("Failed to export report: {0}")]
    Export(String),

    /// The caller went away before the operation finished.
    #[error("Operation cancelled")]
    Cancelled,

    /// Failure from the raw URL fetcher.
    #[error(transparent)]
    Fetch(#[from] UrlFetchError),
}

pub type Result<T> = std::result::Result<T, FleetError>;

impl FleetError {
    /// Build an upstream error with the generic message used when the
    /// tracking API does not explain itself.
    pub fn upstream(status: u16, message: Option<String>) -> Self {
        FleetError::Upstream {
            status,
            message: message.unwrap_or_else(|| "An unexpected error occurred".to_string()),
        }
    }

    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            FleetError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            FleetError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            FleetError::DatasetTooLarge { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FleetError::AssetLoad(_) | FleetError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Nobody is listening any more; the code only shows up in logs.
            FleetError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            FleetError::Fetch(e) => e.status_code(),
        }
    }
}

impl From<reqwest::Error> for FleetError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16()).unwrap_or(500);
        let message = if e.is_decode() {
            "Invalid response format".to_string()
        } else {
            e.to_string()
        };
        FleetError::Upstream { status, message }
    }
}

impl IntoResponse for FleetError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            FleetError::Fetch(e) => json!({ "error": e.message, "code": e.code }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

fn format_count(n: &usize) -> String {
    group_thousands(*n)
}

/// Render an integer with `,` thousands separators (`51234` -> `51,234`).
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(50_001), "50,001");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_dataset_too_large_message() {
        let err = FleetError::DatasetTooLarge { total: 64_000 };
        assert_eq!(
            err.to_string(),
            "Large dataset detected (64,000 records). Please reduce the time range or interval."
        );
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_upstream_default_message() {
        let err = FleetError::upstream(503, None);
        assert_eq!(err.to_string(), "An unexpected error occurred");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
