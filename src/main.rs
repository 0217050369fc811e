//! fleetview - temperature telemetry for vehicle fleets.
//!
//! # API Endpoints
//!
//! - `GET /devices` - Device groups (cached 30 s per credential)
//! - `GET /devices/status` - Status counts
//! - `GET /devices/temperature` - Devices with a temperature sensor
//! - `GET /devices/export.csv` - Device table as CSV
//! - `GET /user` - Account details for the credential
//! - `GET /address` - Reverse geocode a coordinate
//! - `POST /reports/temperature` - Run a temperature report
//! - `POST /reports/temperature/export` - Export a report as JPEG or PDF
//! - `GET /viewer` - Raw JSON of a tracking API URL
//! - `GET /health` - Health check
//!
//! Configuration is read from `FLEETVIEW_*` environment variables; see
//! [`fleetview::config`].

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fleetview::api::{AppState, router};
use fleetview::config::AppConfig;
use fleetview::poller::{self, POLL_INTERVAL};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials travel in query strings; keep request logging at INFO.
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("fleetview=info".parse()?))
        .init();

    let config = AppConfig::from_env();
    info!(
        port = config.port,
        api_base = %config.api_base,
        logo = config.logo_path.is_some(),
        font = config.font_path.is_some(),
        "Starting fleetview"
    );

    let state = AppState::from_config(&config);
    let shutdown = CancellationToken::new();

    if let Some(api_hash) = config.poll_api_hash.clone() {
        info!(interval_secs = POLL_INTERVAL.as_secs(), "Status poller enabled");
        tokio::spawn(poller::run(
            state.cache.clone(),
            api_hash,
            POLL_INTERVAL,
            shutdown.clone(),
            |_| {},
        ));
    }

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "fleetview is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
