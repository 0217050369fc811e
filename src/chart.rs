//! Projection of sorted records onto the temperature chart.
//!
//! The chart itself is drawn by the front end. This module produces the
//! `(x_ms, y)` series and the text for axis labels and tooltips.

use serde::Serialize;

use crate::model::SensorRecord;
use crate::timezone::{format_record_time, shift_to_chart_millis, unshift_chart_millis};

pub const CHART_TITLE: &str = "Temperature Report";
pub const X_AXIS_NAME: &str = "Date & Time";
pub const Y_AXIS_NAME: &str = "Temperature (°C)";

/// One chart point: shifted epoch milliseconds and temperature.
pub type ChartPoint = (i64, f64);

/// Series handed to the chart renderer.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub title: &'static str,
    pub x_axis: &'static str,
    pub y_axis: &'static str,
    pub points: Vec<ChartPoint>,
}

/// Map sorted records onto chart points. Order is preserved.
pub fn project(records: &[SensorRecord]) -> Vec<ChartPoint> {
    records
        .iter()
        .map(|r| (shift_to_chart_millis(r.timestamp), r.temperature))
        .collect()
}

impl ChartSeries {
    pub fn from_records(records: &[SensorRecord]) -> Self {
        Self {
            title: CHART_TITLE,
            x_axis: X_AXIS_NAME,
            y_axis: Y_AXIS_NAME,
            points: project(records),
        }
    }
}

/// Axis label for an x value. Matches the table date of the source record.
pub fn axis_label(x_ms: i64) -> String {
    format_record_time(unshift_chart_millis(x_ms).div_euclid(1000))
}

/// Tooltip text for a point.
pub fn tooltip(point: ChartPoint) -> String {
    format!("{}\nTemperature: {} °C", axis_label(point.0), point.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_applies_fixed_shift() {
        let records = vec![
            SensorRecord { timestamp: 1000, temperature: 20.5 },
            SensorRecord { timestamp: 1002, temperature: 21.0 },
        ];

        assert_eq!(
            project(&records),
            vec![(1_000_000 - 19_800_000, 20.5), (1_002_000 - 19_800_000, 21.0)]
        );
    }

    #[test]
    fn test_label_matches_table_date() {
        let ts = 1_718_000_123;
        let (x, _) = project(&[SensorRecord { timestamp: ts, temperature: 0.0 }])[0];
        assert_eq!(axis_label(x), format_record_time(ts));
    }

    #[test]
    fn test_tooltip() {
        let text = tooltip((shift_to_chart_millis(1_704_067_200), 4.5));
        assert_eq!(text, "01-01-2024 00:00:00\nTemperature: 4.5 °C");
    }

    #[test]
    fn test_series_metadata() {
        let series = ChartSeries::from_records(&[]);
        assert_eq!(series.title, "Temperature Report");
        assert!(series.points.is_empty());
    }
}
