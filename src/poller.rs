//! Background device status refresh.
//!
//! Ticks every [`POLL_INTERVAL`], pulls the device list through the cache and
//! logs the status counts. The first tick fires immediately. A failed refresh
//! is logged and the next tick tries again; nothing is retried in between.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::{DeviceCache, DeviceSource};
use crate::model::DeviceStatusCount;
use crate::summary::status_count;

pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Fetch once and count devices by status.
pub async fn refresh<S: DeviceSource>(cache: &DeviceCache<S>, api_hash: &str) -> Option<DeviceStatusCount> {
    match cache.get_devices(api_hash).await {
        Ok(listing) => {
            let count = status_count(&listing.devices);
            info!(
                running = count.running,
                stop = count.stop,
                offline = count.offline,
                total = count.total,
                from_cache = listing.from_cache,
                "Device status refreshed"
            );
            Some(count)
        }
        Err(e) => {
            warn!(error = %e, "Device status refresh failed");
            None
        }
    }
}

/// Poll until `shutdown` fires. Calls `on_count` after each successful refresh.
pub async fn run<S, F>(
    cache: DeviceCache<S>,
    api_hash: String,
    interval: Duration,
    shutdown: CancellationToken,
    mut on_count: F,
) where
    S: DeviceSource,
    F: FnMut(DeviceStatusCount),
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Status poller stopped");
                return;
            }
            _ = ticker.tick() => {
                if let Some(count) = refresh(&cache, &api_hash).await {
                    on_count(count);
                }
            }
        }
    }
}
