//! Device-level summaries: status counts, the temperature device picker and
//! the CSV export of the device table.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{FleetError, Result};
use crate::model::{Device, DeviceGroup, DeviceSensor, DeviceStatus, DeviceStatusCount, scalar_text};
use crate::timezone::{RECORD_TIME_FORMAT, format_display_millis};

/// Column headers of the device CSV, in order.
pub const CSV_HEADERS: [&str; 14] = [
    "#",
    "Vehicle Number",
    "Status",
    "Last Data",
    "Ignition",
    "Speed",
    "Power",
    "Battery",
    "Odometer",
    "Satellites",
    "GSM Signal",
    "AC Status",
    "Temperature",
    "Stop Duration",
];

/// Flatten groups into one device list, preserving order.
pub fn flatten(groups: &[DeviceGroup]) -> Vec<&Device> {
    groups.iter().flat_map(|g| g.items.iter()).collect()
}

/// Count devices by status across all groups.
pub fn status_count(groups: &[DeviceGroup]) -> DeviceStatusCount {
    let mut count = DeviceStatusCount::default();
    for device in flatten(groups) {
        match device.status() {
            DeviceStatus::Running => count.running += 1,
            DeviceStatus::Stopped => count.stop += 1,
            DeviceStatus::Offline => count.offline += 1,
        }
        count.total += 1;
    }
    count
}

/// Whether a device carries a usable `Temperature` sensor reading.
pub fn has_temperature(device: &Device) -> bool {
    device.sensor_named("Temperature").is_some_and(|sensor| {
        sensor.val_text().as_deref() != Some("-") && sensor.val_number().is_some()
    })
}

/// Devices offered for temperature reports, sorted by name.
///
/// `search`, when given, keeps names containing it (case-insensitive).
pub fn temperature_devices(groups: &[DeviceGroup], search: Option<&str>) -> Vec<Device> {
    let needle = search.map(str::to_lowercase).unwrap_or_default();
    let mut devices: Vec<Device> = flatten(groups)
        .into_iter()
        .filter(|d| has_temperature(d))
        .filter(|d| d.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    devices.sort_by(|a, b| a.name.cmp(&b.name));
    devices
}

// ============================================================================
// CSV export
// ============================================================================

/// Download name of the device CSV, stamped with `now` in the display zone.
pub fn csv_filename(now: DateTime<Utc>) -> String {
    let stamp = format_display_millis(now.timestamp_millis(), "%Y-%m-%d-%H-%M")
        .unwrap_or_else(|| now.format("%Y-%m-%d-%H-%M").to_string());
    format!("temperature-summary-{stamp}.csv")
}

fn on_off(sensor: Option<&DeviceSensor>) -> String {
    if sensor.is_some_and(|s| s.is_on()) { "ON" } else { "OFF" }.to_string()
}

fn rounded(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{unit}", v.round() as i64),
        None => "-".to_string(),
    }
}

/// `HH:MM:SS` for a positive duration, the raw value otherwise.
pub fn format_stop_duration(seconds: Option<i64>) -> String {
    match seconds {
        Some(s) if s > 0 => format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60),
        Some(s) => s.to_string(),
        None => String::new(),
    }
}

fn last_data(timestamp: Option<i64>) -> String {
    match timestamp.filter(|ts| *ts != 0) {
        Some(ts) => ts
            .checked_mul(1000)
            .and_then(|ms| format_display_millis(ms, RECORD_TIME_FORMAT))
            .unwrap_or_else(|| "Invalid Date".to_string()),
        None => String::new(),
    }
}

/// One CSV row for `device` at 1-based position `index`.
pub fn csv_row(index: usize, device: &Device) -> Vec<String> {
    let temperature = device
        .sensor_named("Temperature")
        .and_then(|s| s.val_text())
        .filter(|t| !t.is_empty() && t != "-")
        .map(|t| format!("{t}°C"))
        .unwrap_or_else(|| "-".to_string());
    let satellites = device
        .sensor_of_kind("satellites")
        .and_then(|s| s.value.as_ref())
        .and_then(scalar_text)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "N/A".to_string());

    vec![
        index.to_string(),
        device.name.clone(),
        device.status().label().to_string(),
        last_data(device.timestamp),
        on_off(device.sensor_of_kind("ignition")),
        device
            .speed
            .map(|s| format!("{} km/h", s.round() as i64))
            .unwrap_or_default(),
        rounded(device.sensor_named("Power").and_then(|s| s.val_number()), " V"),
        rounded(device.sensor_named("Battery").and_then(|s| s.val_number()), "%"),
        rounded(device.sensor_of_kind("odometer").and_then(|s| s.val_number()), " km"),
        satellites,
        rounded(device.sensor_of_kind("gsm").and_then(|s| s.val_number()), "%"),
        on_off(device.sensor_named("AC")),
        temperature,
        format_stop_duration(device.stop_duration_sec),
    ]
}

/// Render the device table as CSV bytes, header row first.
pub fn devices_csv(groups: &[DeviceGroup]) -> Result<Vec<u8>> {
    // Header cells are always quoted; data rows only where needed.
    let header = CSV_HEADERS.map(|h| format!("\"{h}\"")).join(",");
    let mut out = Vec::with_capacity(header.len() + 1);
    out.extend_from_slice(header.as_bytes());
    out.push(b'\n');

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    let csv_err = |e: csv::Error| FleetError::Export(e.to_string());

    let devices = flatten(groups);
    for (i, device) in devices.iter().enumerate() {
        writer.write_record(csv_row(i + 1, device)).map_err(csv_err)?;
    }
    debug!(rows = devices.len(), "Device CSV rendered");

    writer
        .into_inner()
        .map_err(|e| FleetError::Export(e.to_string()))
}
