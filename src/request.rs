//! Construction of `generate_report` requests.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{FleetError, Result};

/// Report type code for temperature reports.
pub const TEMPERATURE_REPORT_TYPE: u32 = 13;

/// Sampling interval used until the user picks another one.
pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

pub const MIN_INTERVAL_MINUTES: u32 = 5;
pub const MAX_INTERVAL_MINUTES: u32 = 60;

/// The sampling interval chosen for a report.
///
/// Input outside `[5, 60]` is not an error: it is ignored and the previous
/// value stays in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSelection(u32);

impl Default for IntervalSelection {
    fn default() -> Self {
        Self(DEFAULT_INTERVAL_MINUTES)
    }
}

impl IntervalSelection {
    pub fn minutes(&self) -> u32 {
        self.0
    }

    /// Apply raw user input. Returns whether the value was accepted.
    pub fn apply(&mut self, input: &str) -> bool {
        match parse_leading_int(input) {
            Some(n) if (MIN_INTERVAL_MINUTES as i64..=MAX_INTERVAL_MINUTES as i64).contains(&n) => {
                self.0 = n as u32;
                true
            }
            _ => false,
        }
    }
}

/// `parseInt`-style: optional sign then leading digits, rest ignored.
fn parse_leading_int(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}

/// What the caller asks for when running a temperature report.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportParams {
    pub device_id: String,

    /// `yyyy-MM-ddTHH:mm` with optional seconds.
    pub from: String,

    pub to: String,

    /// Raw interval input; ignored when out of range.
    #[serde(default)]
    pub interval: Option<IntervalInput>,
}

/// Interval input as sent by a form (string) or a script (number).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IntervalInput {
    Number(i64),
    Text(String),
}

impl IntervalInput {
    fn as_text(&self) -> String {
        match self {
            IntervalInput::Number(n) => n.to_string(),
            IntervalInput::Text(s) => s.clone(),
        }
    }
}

/// Normalized `generate_report` query for one device and time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRequestDescriptor {
    pub device_id: String,
    pub date_from: String,
    pub time_from: String,
    pub date_to: String,
    pub time_to: String,
    pub interval_minutes: u32,
    pub report_type: u32,
}

impl ReportRequestDescriptor {
    /// Build a descriptor from already-parsed boundaries.
    pub fn new(
        device_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
        interval: IntervalSelection,
    ) -> Self {
        Self {
            device_id: device_id.to_string(),
            date_from: from.format("%Y-%m-%d").to_string(),
            time_from: from.format("%H:%M").to_string(),
            date_to: to.format("%Y-%m-%d").to_string(),
            time_to: to.format("%H:%M").to_string(),
            interval_minutes: interval.minutes(),
            report_type: TEMPERATURE_REPORT_TYPE,
        }
    }

    /// Build a descriptor from raw caller input.
    pub fn from_params(params: &ReportParams) -> Result<Self> {
        if params.device_id.trim().is_empty() {
            return Err(FleetError::InvalidInput("device_id is required".to_string()));
        }
        let from = parse_datetime(&params.from)?;
        let to = parse_datetime(&params.to)?;

        let mut interval = IntervalSelection::default();
        if let Some(input) = &params.interval {
            interval.apply(&input.as_text());
        }

        Ok(Self::new(params.device_id.trim(), from, to, interval))
    }

    /// Query pairs for the upstream call, credential included.
    pub fn query_pairs(&self, api_hash: &str) -> Vec<(&'static str, String)> {
        vec![
            ("lang", "en".to_string()),
            ("user_api_hash", api_hash.to_string()),
            ("format", "json".to_string()),
            ("type", self.report_type.to_string()),
            ("devices[]", self.device_id.clone()),
            ("date_from", self.date_from.clone()),
            ("from_time", self.time_from.clone()),
            ("date_to", self.date_to.clone()),
            ("to_time", self.time_to.clone()),
            ("interval", self.interval_minutes.to_string()),
            ("generate", "1".to_string()),
        ]
    }

    /// Full request URL against `base_url`.
    pub fn url(&self, base_url: &str, api_hash: &str) -> String {
        let query = self
            .query_pairs(api_hash)
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}/generate_report?{}", base_url.trim_end_matches('/'), query)
    }
}

/// Parse a `datetime-local` style value.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| FleetError::InvalidInput(format!("unrecognized datetime '{value}'")))
}
