//! End-to-end temperature report processing.
//!
//! request builder → tracking API → extractor → sort/paging → chart series.
//!
//! Extraction runs on its own task so a slow report does not hold the request
//! handler's worker. The caller hands in a [`CancellationToken`]; cancelling
//! it stops the extractor at the next batch boundary.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::chart::ChartSeries;
use crate::error::{FleetError, Result};
use crate::extract::{Progress, extract_records};
use crate::request::{ReportParams, ReportRequestDescriptor};
use crate::series::{RecordPages, TableRow, TableState};
use crate::upstream::TrackingClient;

/// Everything a temperature view needs for one page of a report.
#[derive(Debug, Clone, Serialize)]
pub struct TemperatureReport {
    pub state: TableState,

    /// Page actually returned after clamping.
    pub page: usize,
    pub total_pages: usize,

    /// Usable readings across all pages.
    pub total_records: usize,

    /// Raw entries in the upstream payload.
    pub entries: usize,

    /// Entries dropped as malformed.
    pub dropped: usize,

    pub rows: Vec<TableRow>,
    pub chart: ChartSeries,

    /// The upstream request, for the API details panel.
    pub api_url: String,
}

/// Run a temperature report and return page `page` of the result.
#[instrument(skip(client, api_hash, cancel), fields(device = %params.device_id))]
pub async fn run_temperature_report(
    client: &TrackingClient,
    api_hash: &str,
    params: &ReportParams,
    page: usize,
    cancel: CancellationToken,
) -> Result<TemperatureReport> {
    let descriptor = ReportRequestDescriptor::from_params(params)?;
    let api_url = client.report_url(&descriptor, api_hash);

    let response = client.generate_report(&descriptor, api_hash).await?;
    let payload = response
        .into_payload()
        .ok_or_else(|| FleetError::upstream(200, Some("Invalid response format".to_string())))?;

    let token = cancel.clone();
    let extraction = tokio::spawn(async move {
        let mut last = Progress::default();
        let extraction = extract_records(&payload, &token, |p| last = p).await?;
        info!(processed = last.processed, total = last.total, "Extraction finished");
        Ok::<_, FleetError>(extraction)
    })
    .await
    .map_err(|e| {
        if cancel.is_cancelled() {
            FleetError::Cancelled
        } else {
            FleetError::Export(format!("extraction task failed: {e}"))
        }
    })??;

    let pages = RecordPages::new(extraction.records);
    let chart = ChartSeries::from_records(pages.records());
    let page = pages.clamp_page(page).unwrap_or(0);

    Ok(TemperatureReport {
        state: TableState::of(&pages),
        page,
        total_pages: pages.total_pages(),
        total_records: pages.len(),
        entries: extraction.total,
        dropped: extraction.dropped,
        rows: pages.rows(page),
        chart,
        api_url,
    })
}
