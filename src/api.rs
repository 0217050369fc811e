//! HTTP API handlers for fleetview.
//!
//! Every route that reaches the tracking API takes the caller's credential as
//! the `user_api_hash` query parameter. The credential is passed through and
//! never logged.
//!
//! # Endpoints
//!
//! - `GET /health`
//! - `GET /devices`, `/devices/status`, `/devices/temperature`, `/devices/export.csv`
//! - `GET /user`, `GET /address?lat=&lon=`
//! - `POST /reports/temperature?page=`
//! - `POST /reports/temperature/export?format=jpg|pdf`
//! - `GET /viewer?url=`
//!
//! Errors come back as `{ "error": "<message>" }` with the status mapped from
//! [`FleetError`].

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::cache::DeviceCache;
use crate::config::AppConfig;
use crate::error::{FleetError, Result};
use crate::export::{ExportFormat, ReportExporter, ReportMetadata};
use crate::fetcher::UrlFetcher;
use crate::model::{DeviceStatusCount, LocationAddress, UserResponse};
use crate::pipeline::{TemperatureReport, run_temperature_report};
use crate::request::{ReportParams, parse_datetime};
use crate::summary::{csv_filename, devices_csv, status_count, temperature_devices};
use crate::upstream::TrackingClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: TrackingClient,
    pub cache: DeviceCache<TrackingClient>,
    pub exporter: ReportExporter,
    pub fetcher: UrlFetcher,
}

impl AppState {
    /// Wire up clients from configuration. The URL fetcher is pinned to the
    /// tracking API's host.
    pub fn from_config(config: &AppConfig) -> Self {
        let client = TrackingClient::with_base_url(&config.api_base);
        let mut fetcher = UrlFetcher::new(config.fetch_timeout);
        if let Some(host) = client.host() {
            fetcher = fetcher.restrict_to_host(&host);
        }

        Self {
            cache: DeviceCache::new(client.clone()),
            client,
            exporter: ReportExporter::new(config.logo_path.clone(), config.font_path.clone()),
            fetcher,
        }
    }
}

/// Build the router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/devices", get(get_devices))
        .route("/devices/status", get(get_device_status))
        .route("/devices/temperature", get(get_temperature_devices))
        .route("/devices/export.csv", get(export_devices_csv))
        .route("/user", get(get_user))
        .route("/address", get(get_address))
        .route("/reports/temperature", post(post_temperature_report))
        .route("/reports/temperature/export", post(export_temperature_report))
        .route("/viewer", get(view_url))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// ============================================================================
// Query and body types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialQuery {
    pub user_api_hash: String,
}

impl CredentialQuery {
    fn api_hash(&self) -> Result<&str> {
        credential(&self.user_api_hash)
    }
}

#[derive(Debug, Deserialize)]
pub struct TemperatureDevicesQuery {
    pub user_api_hash: String,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub user_api_hash: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub user_api_hash: String,
    #[serde(default)]
    pub page: usize,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: ExportFormat,
}

/// Body of an export request. `chart_image` is the chart captured by the
/// front end, base64 encoded, optionally as a `data:` URL.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default = "default_report_name")]
    pub report_name: String,
    pub device: String,
    pub from: String,
    pub to: String,
    pub chart_image: String,
}

fn default_report_name() -> String {
    "Temperature".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    #[serde(default)]
    pub url: String,
}

fn credential(hash: &str) -> Result<&str> {
    let hash = hash.trim();
    if hash.is_empty() {
        return Err(FleetError::InvalidInput("user_api_hash is required".to_string()));
    }
    Ok(hash)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /devices - Device groups, served from the 30 s cache when fresh.
#[instrument(skip(state, query))]
pub async fn get_devices(
    State(state): State<AppState>,
    Query(query): Query<CredentialQuery>,
) -> Result<Json<Value>> {
    let listing = state.cache.get_devices(query.api_hash()?).await?;
    info!(groups = listing.devices.len(), from_cache = listing.from_cache, "Devices listed");

    Ok(Json(json!({
        "groups": &*listing.devices,
        "from_cache": listing.from_cache,
    })))
}

/// GET /devices/status - Running / stopped / offline counts.
#[instrument(skip(state, query))]
pub async fn get_device_status(
    State(state): State<AppState>,
    Query(query): Query<CredentialQuery>,
) -> Result<Json<DeviceStatusCount>> {
    let listing = state.cache.get_devices(query.api_hash()?).await?;
    Ok(Json(status_count(&listing.devices)))
}

/// GET /devices/temperature - Devices with a usable temperature sensor.
#[instrument(skip(state, query))]
pub async fn get_temperature_devices(
    State(state): State<AppState>,
    Query(query): Query<TemperatureDevicesQuery>,
) -> Result<Json<Value>> {
    let listing = state.cache.get_devices(credential(&query.user_api_hash)?).await?;
    let devices = temperature_devices(&listing.devices, query.search.as_deref());
    info!(count = devices.len(), "Temperature devices listed");

    Ok(Json(json!({ "devices": devices })))
}

/// GET /devices/export.csv - Device table as a CSV attachment.
#[instrument(skip(state, query))]
pub async fn export_devices_csv(
    State(state): State<AppState>,
    Query(query): Query<CredentialQuery>,
) -> Result<impl IntoResponse> {
    let listing = state.cache.get_devices(query.api_hash()?).await?;
    let body = devices_csv(&listing.devices)?;
    let disposition = format!("attachment; filename=\"{}\"", csv_filename(Utc::now()));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// GET /user - Account owner's profile.
#[instrument(skip(state, query))]
pub async fn get_user(
    State(state): State<AppState>,
    Query(query): Query<CredentialQuery>,
) -> Result<Json<UserResponse>> {
    Ok(Json(state.client.get_user(query.api_hash()?).await?))
}

/// GET /address - Reverse geocoding.
#[instrument(skip(state, query), fields(lat = query.lat, lon = query.lon))]
pub async fn get_address(
    State(state): State<AppState>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<LocationAddress>> {
    let api_hash = credential(&query.user_api_hash)?;
    Ok(Json(state.client.reverse_geocode(api_hash, query.lat, query.lon).await?))
}

/// POST /reports/temperature - Run a report and return one page of it.
///
/// If the client disconnects, the handler future is dropped and the guard
/// cancels extraction.
#[instrument(skip(state, query, params), fields(device = %params.device_id, page = query.page))]
pub async fn post_temperature_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    Json(params): Json<ReportParams>,
) -> Result<Json<TemperatureReport>> {
    let api_hash = credential(&query.user_api_hash)?;
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match run_temperature_report(&state.client, api_hash, &params, query.page, cancel).await {
        Ok(report) => {
            info!(
                records = report.total_records,
                dropped = report.dropped,
                pages = report.total_pages,
                "Temperature report generated"
            );
            Ok(Json(report))
        }
        Err(e) => {
            warn!(error = %e, "Temperature report failed");
            Err(e)
        }
    }
}

/// POST /reports/temperature/export - Render the report as JPEG or PDF.
#[instrument(skip(state, body), fields(format = ?query.format, device = %body.device))]
pub async fn export_temperature_report(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
    Json(body): Json<ExportRequest>,
) -> Result<impl IntoResponse> {
    let metadata = ReportMetadata {
        report_name: body.report_name,
        device: body.device,
        from: parse_datetime(&body.from)?,
        to: parse_datetime(&body.to)?,
    };
    let chart = decode_image_payload(&body.chart_image)?;

    let bytes = state.exporter.render(query.format, &metadata, chart).await?;
    let disposition = format!("attachment; filename=\"{}\"", query.format.filename());

    Ok((
        [
            (header::CONTENT_TYPE, query.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// GET /viewer - Fetch a tracking API URL and return its JSON.
#[instrument(skip(state, query))]
pub async fn view_url(
    State(state): State<AppState>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<Value>> {
    Ok(Json(state.fetcher.fetch_json(&query.url).await?))
}

/// Decode base64 image data, accepting a `data:<mime>;base64,` prefix.
fn decode_image_payload(data: &str) -> Result<Vec<u8>> {
    let encoded = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| FleetError::InvalidInput(format!("chart_image is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_image_payload() {
        assert_eq!(decode_image_payload("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_image_payload("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(matches!(
            decode_image_payload("%%%"),
            Err(FleetError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_blank_credential_rejected() {
        assert!(credential("   ").is_err());
        assert_eq!(credential(" abc ").unwrap(), "abc");
    }
}
