//! Display time handling for report timestamps.
//!
//! Devices report epoch seconds that are rendered by shifting them back a
//! fixed 5h30m and showing the result in the +05:30 display zone. This is a
//! constant offset, not real timezone conversion, and existing report output
//! depends on it being exact. Everything that touches the shift goes through
//! the functions here.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

/// Offset subtracted from every chart point, in milliseconds (5.5 hours).
pub const CHART_SHIFT_MS: i64 = 19_800_000;

/// Zone the shifted instants are rendered in, in seconds east of UTC.
pub const DISPLAY_OFFSET_SECS: i32 = 19_800;

/// Format used for table rows, chart labels and tooltips.
pub const RECORD_TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Format used for the from/to fields of exported reports.
pub const REPORT_RANGE_FORMAT: &str = "%d-%m-%Y %H:%M";

/// Shifted epoch milliseconds for `timestamp_secs`, or `None` when the
/// result is not an instant chrono can represent.
fn shifted_millis(timestamp_secs: i64) -> Option<i64> {
    let ms = timestamp_secs.checked_mul(1000)?.checked_sub(CHART_SHIFT_MS)?;
    DateTime::from_timestamp_millis(ms).map(|_| ms)
}

/// Whether a record timestamp (epoch seconds) can be shown on the chart and
/// in tables. Extraction drops records that fail this.
pub fn is_representable(timestamp_secs: i64) -> bool {
    shifted_millis(timestamp_secs).is_some()
}

/// Map epoch seconds onto the chart's x axis.
///
/// Saturates for timestamps outside [`is_representable`].
pub fn shift_to_chart_millis(timestamp_secs: i64) -> i64 {
    timestamp_secs.saturating_mul(1000).saturating_sub(CHART_SHIFT_MS)
}

/// Inverse of [`shift_to_chart_millis`]; yields epoch milliseconds.
pub fn unshift_chart_millis(chart_millis: i64) -> i64 {
    chart_millis.saturating_add(CHART_SHIFT_MS)
}

/// Render epoch milliseconds in the display zone.
pub fn format_display_millis(epoch_millis: i64, fmt: &str) -> Option<String> {
    let zone = FixedOffset::east_opt(DISPLAY_OFFSET_SECS)?;
    let utc = DateTime::from_timestamp_millis(epoch_millis)?;
    Some(utc.with_timezone(&zone).format(fmt).to_string())
}

/// Text shown for a record timestamp (epoch seconds) in tables and labels.
///
/// Returns `"Invalid Date"` for instants chrono cannot represent.
pub fn format_record_time(timestamp_secs: i64) -> String {
    shifted_millis(timestamp_secs)
        .and_then(|ms| format_display_millis(ms, RECORD_TIME_FORMAT))
        .unwrap_or_else(|| "Invalid Date".to_string())
}

/// Text shown for a report range boundary (`dd-MM-yyyy HH:mm`).
pub fn format_range_boundary(value: &NaiveDateTime) -> String {
    value.format(REPORT_RANGE_FORMAT).to_string()
}
