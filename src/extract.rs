//! Flattening of raw report payloads into [`SensorRecord`]s.
//!
//! Extraction walks every sensor in batches of [`BATCH_SIZE`] entries, yields
//! to the runtime between batches and reports progress after each one. A
//! payload larger than [`MAX_REPORT_ENTRIES`] is refused before any work is
//! done.
//!
//! # Entry rules
//!
//! An entry becomes a record when:
//! - its `t` field coerces to a positive integer (numbers, or strings holding
//!   one) that still names a representable date once converted to
//!   milliseconds; `0`, empty strings, `null` and booleans count as missing, and
//! - its `v` field coerces to a number the way `parseFloat` does (longest
//!   leading numeric prefix of a string).
//!
//! Entries whose value is present but not numeric are dropped and counted in
//! [`Extraction::dropped`] rather than carried along as NaN.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{FleetError, MAX_REPORT_ENTRIES, Result};
use crate::model::{RawSensorPayload, SensorRecord};
use crate::timezone::is_representable;

/// Number of raw entries processed between cooperative yields.
pub const BATCH_SIZE: usize = 1000;

/// Progress of one extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Raw entries consumed so far, well-formed or not.
    pub processed: usize,

    /// Raw entries in the payload.
    pub total: usize,
}

/// Result of a completed extraction.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Records in sensor-then-entry order; not yet sorted.
    pub records: Vec<SensorRecord>,

    /// Raw entries in the payload.
    pub total: usize,

    /// Entries skipped because their time or value was missing or malformed.
    pub dropped: usize,
}

/// Fail with [`FleetError::DatasetTooLarge`] when the payload is over the limit.
pub fn check_size(payload: &RawSensorPayload) -> Result<usize> {
    let total = payload.entry_count();
    if total > MAX_REPORT_ENTRIES {
        return Err(FleetError::DatasetTooLarge { total });
    }
    Ok(total)
}

/// Extract every well-formed record from `payload`.
///
/// `on_progress` is called once per batch with a strictly increasing
/// `processed` count. The run stops with [`FleetError::Cancelled`] as soon as
/// `cancel` fires; no partial output is returned in that case.
pub async fn extract_records<F>(
    payload: &RawSensorPayload,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<Extraction>
where
    F: FnMut(Progress),
{
    let total = check_size(payload)?;

    let mut records = Vec::with_capacity(total);
    let mut processed = 0;

    for (sensor_id, sensor) in &payload.sensors {
        let entries: Vec<&Value> = sensor.values.values().collect();

        for batch in entries.chunks(BATCH_SIZE) {
            if cancel.is_cancelled() {
                info!(processed, total, "Extraction cancelled");
                return Err(FleetError::Cancelled);
            }

            records.extend(batch.iter().filter_map(|entry| parse_entry(entry)));

            processed += batch.len();
            on_progress(Progress { processed, total });
            debug!(sensor = %sensor_id, processed, total, "Batch extracted");

            tokio::task::yield_now().await;
        }
    }

    let dropped = total - records.len();
    info!(records = records.len(), dropped, "Sensor records extracted");

    Ok(Extraction {
        records,
        total,
        dropped,
    })
}

/// Turn one raw `{ t, v }` entry into a record, if it is well-formed.
pub fn parse_entry(entry: &Value) -> Option<SensorRecord> {
    let timestamp = coerce_timestamp(entry.get("t")?)?;
    let temperature = coerce_float(entry.get("v")?)?;
    Some(SensorRecord {
        timestamp,
        temperature,
    })
}

fn coerce_timestamp(value: &Value) -> Option<i64> {
    let ts = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?
        }
        _ => return None,
    };
    (ts > 0 && is_representable(ts)).then_some(ts)
}

/// Numeric coercion for readings; `None` where `parseFloat` would give NaN.
pub fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_leading_float(s),
        _ => None,
    }
}

/// Parse the longest leading decimal number in `s`, skipping leading
/// whitespace: `"21.5°C"` gives `21.5`, `"abc"` gives `None`.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    // Optional exponent, only taken when it has digits.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> RawSensorPayload {
        serde_json::from_value(value).unwrap()
    }

    /// Payload with one sensor holding `n` valid entries.
    fn sized_payload(n: usize) -> RawSensorPayload {
        let values: serde_json::Map<String, Value> = (0..n)
            .map(|i| (format!("e{i:06}"), json!({ "t": 1_000 + i, "v": "20.0" })))
            .collect();
        payload(json!({ "sensors": { "1": { "values": values } } }))
    }

    #[tokio::test]
    async fn test_extracts_example_payload() {
        let payload = payload(json!({
            "sensors": {
                "1": { "values": {
                    "a": { "t": 1000, "v": "20.5" },
                    "b": { "t": 1002, "v": "21.0" }
                } }
            }
        }));

        let out = extract_records(&payload, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(
            out.records,
            vec![
                SensorRecord { timestamp: 1000, temperature: 20.5 },
                SensorRecord { timestamp: 1002, temperature: 21.0 },
            ]
        );
        assert_eq!(out.total, 2);
        assert_eq!(out.dropped, 0);
    }

    #[tokio::test]
    async fn test_drops_malformed_entries() {
        let payload = payload(json!({
            "sensors": {
                "1": { "values": {
                    "ok": { "t": "1700000000", "v": 4.25 },
                    "no_time": { "v": "3" },
                    "zero_time": { "t": 0, "v": "3" },
                    "no_value": { "t": 1700000001 },
                    "null_value": { "t": 1700000002, "v": null },
                    "nan_value": { "t": 1700000003, "v": "n/a" },
                    "not_an_object": 12
                } }
            }
        }));

        let out = extract_records(&payload, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].timestamp, 1_700_000_000);
        assert_eq!(out.total, 7);
        assert_eq!(out.dropped, 6);
    }

    #[tokio::test]
    async fn test_drops_timestamps_beyond_date_range() {
        let payload = payload(json!({
            "sensors": {
                "1": { "values": {
                    "a": { "t": "9223372036854775807", "v": "20.5" },
                    "b": { "t": 1e300, "v": "20.5" },
                    "c": { "t": 1_000_000_000_000_000i64, "v": "20.5" },
                    "d": { "t": 1000, "v": "21.0" }
                } }
            }
        }));

        let out = extract_records(&payload, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(out.records, vec![SensorRecord { timestamp: 1000, temperature: 21.0 }]);
        assert_eq!(out.dropped, 3);

        let series = crate::chart::ChartSeries::from_records(&out.records);
        assert_eq!(series.points, vec![(1_000_000 - 19_800_000, 21.0)]);
    }

    #[tokio::test]
    async fn test_rejects_oversized_payload_before_work() {
        let payload = sized_payload(MAX_REPORT_ENTRIES + 1);
        let mut calls = 0;

        let err = extract_records(&payload, &CancellationToken::new(), |_| calls += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, FleetError::DatasetTooLarge { total } if total == MAX_REPORT_ENTRIES + 1));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_accepts_payload_at_limit() {
        let payload = sized_payload(MAX_REPORT_ENTRIES);
        let out = extract_records(&payload, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(out.records.len(), MAX_REPORT_ENTRIES);
    }

    #[tokio::test]
    async fn test_progress_strictly_increases_per_batch() {
        let payload = sized_payload(2_500);
        let mut seen = Vec::new();

        extract_records(&payload, &CancellationToken::new(), |p| seen.push(p))
            .await
            .unwrap();

        let counts: Vec<usize> = seen.iter().map(|p| p.processed).collect();
        assert_eq!(counts, vec![1000, 2000, 2500]);
        assert!(seen.iter().all(|p| p.total == 2_500));
    }

    #[tokio::test]
    async fn test_cancelled_run_returns_nothing() {
        let payload = sized_payload(3_000);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let mut batches = 0;

        let result = extract_records(&payload, &cancel, |_| {
            batches += 1;
            trigger.cancel();
        })
        .await;

        assert!(matches!(result, Err(FleetError::Cancelled)));
        assert_eq!(batches, 1);
    }

    #[test]
    fn test_parse_leading_float() {
        assert_eq!(parse_leading_float("20.5"), Some(20.5));
        assert_eq!(parse_leading_float("  -3.25°C"), Some(-3.25));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("7."), Some(7.0));
        assert_eq!(parse_leading_float("1e3x"), Some(1000.0));
        assert_eq!(parse_leading_float("4e"), Some(4.0));
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_float("-"), None);
        assert_eq!(parse_leading_float(""), None);
    }
}
