//! Data models for fleetview.
//!
//! Two families of types live here: the shapes returned by the tracking API
//! (devices and raw report payloads), which are deserialized leniently because
//! the upstream is loose about arrays vs. objects and numbers vs. strings, and
//! the normalized types the telemetry core produces.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single temperature reading extracted from a report payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Epoch seconds as reported by the device. Never negative.
    pub timestamp: i64,

    /// Reading in degrees Celsius.
    pub temperature: f64,
}

// ============================================================================
// Devices
// ============================================================================

/// Connection state of a device, derived from the API's `online` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// `online`: reporting and moving.
    Running,

    /// `ack`: reporting but stopped.
    Stopped,

    /// Anything else.
    Offline,
}

impl DeviceStatus {
    /// Map the upstream `online` string onto a status.
    pub fn from_online(online: &str) -> Self {
        match online {
            "online" => DeviceStatus::Running,
            "ack" => DeviceStatus::Stopped,
            _ => DeviceStatus::Offline,
        }
    }

    /// Label used in exported tables.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceStatus::Running => "Online",
            DeviceStatus::Stopped => "Acknowledged",
            DeviceStatus::Offline => "Offline",
        }
    }
}

/// One sensor entry attached to a device in the `get_devices` listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSensor {
    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "type")]
    pub kind: String,

    /// Formatted value, e.g. `"12 sat"`.
    #[serde(default)]
    pub value: Option<Value>,

    /// Raw value; may be a number, string or boolean.
    #[serde(default)]
    pub val: Option<Value>,
}

impl DeviceSensor {
    /// Raw value as text, if it is a string, number or boolean.
    pub fn val_text(&self) -> Option<String> {
        self.val.as_ref().and_then(scalar_text)
    }

    /// Raw value as a number, following loose numeric coercion.
    pub fn val_number(&self) -> Option<f64> {
        match self.val.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Whether the raw value reads as "on".
    pub fn is_on(&self) -> bool {
        matches!(self.val.as_ref(), Some(Value::Bool(true)))
            || matches!(self.val.as_ref(), Some(Value::String(s)) if s == "true")
    }
}

/// A tracked vehicle as listed by `get_devices`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Device {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub online: String,

    /// Last data time, epoch seconds.
    #[serde(default, deserialize_with = "loose_i64")]
    pub timestamp: Option<i64>,

    #[serde(default, deserialize_with = "loose_f64")]
    pub speed: Option<f64>,

    #[serde(default, deserialize_with = "loose_i64")]
    pub stop_duration_sec: Option<i64>,

    #[serde(default)]
    pub sensors: Vec<DeviceSensor>,
}

impl Device {
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus::from_online(&self.online)
    }

    pub fn sensor_named(&self, name: &str) -> Option<&DeviceSensor> {
        self.sensors.iter().find(|s| s.name == name)
    }

    pub fn sensor_of_kind(&self, kind: &str) -> Option<&DeviceSensor> {
        self.sensors.iter().find(|s| s.kind == kind)
    }
}

/// A group of devices. The API sometimes sends `items` as a single object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceGroup {
    #[serde(default, deserialize_with = "one_or_many")]
    pub items: Vec<Device>,
}

/// Device counts by status across all groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatusCount {
    pub running: usize,
    pub stop: usize,
    pub offline: usize,
    pub total: usize,
}

/// Response of `user_client`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(default)]
    pub data: UserData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,
}

/// Response of `address/reverse`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationAddress {
    #[serde(default)]
    pub location: AddressLocation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressLocation {
    #[serde(default)]
    pub address: String,
}

// ============================================================================
// Report payloads
// ============================================================================

/// Response of `generate_report`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportResponse {
    #[serde(default)]
    pub items: Vec<ReportItem>,

    /// Relative URL of the generated report, when the API supplies one.
    #[serde(default)]
    pub url: Option<String>,
}

/// One device's section of a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportItem {
    #[serde(default, deserialize_with = "optional_keyed")]
    pub sensors: Option<BTreeMap<String, RawSensor>>,
}

impl ReportResponse {
    /// The sensor payload of the first item, if the response has one.
    pub fn into_payload(self) -> Option<RawSensorPayload> {
        let sensors = self.items.into_iter().next()?.sensors?;
        Some(RawSensorPayload { sensors })
    }
}

/// Per-device sensor data from a report, keyed by sensor id.
///
/// Owned by the upstream response; the core only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSensorPayload {
    #[serde(default, deserialize_with = "keyed")]
    pub sensors: BTreeMap<String, RawSensor>,
}

impl RawSensorPayload {
    /// Total number of value entries across every sensor.
    pub fn entry_count(&self) -> usize {
        self.sensors.values().map(RawSensor::entry_count).sum()
    }
}

/// One sensor's readings, keyed by entry id. Entries stay untyped so a single
/// malformed entry cannot fail the whole payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSensor {
    #[serde(default, deserialize_with = "keyed")]
    pub values: BTreeMap<String, Value>,
}

impl RawSensor {
    pub fn entry_count(&self) -> usize {
        self.values.len()
    }
}

// ============================================================================
// Lenient deserializers
// ============================================================================

/// PHP-backed APIs encode empty maps as `[]` and sometimes omit them with
/// `null`. All three collapse into a map here; list positions become keys.
#[derive(Deserialize)]
#[serde(untagged)]
enum Keyed<T> {
    Map(BTreeMap<String, T>),
    List(Vec<T>),
    Null(()),
}

impl<T> From<Keyed<T>> for BTreeMap<String, T> {
    fn from(keyed: Keyed<T>) -> Self {
        match keyed {
            Keyed::Map(map) => map,
            Keyed::List(list) => list
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            Keyed::Null(()) => BTreeMap::new(),
        }
    }
}

fn keyed<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Keyed::<T>::deserialize(deserializer).map(Into::into)
}

fn optional_keyed<'de, D, T>(deserializer: D) -> Result<Option<BTreeMap<String, T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Keyed::<T>::deserialize(deserializer)? {
        Keyed::Null(()) => None,
        other => Some(other.into()),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(Box<T>),
    Null(()),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::<T>::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![*item],
        OneOrMany::Null(()) => Vec::new(),
    })
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value).unwrap_or_default())
}

fn loose_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn loose_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_f64(deserializer)?.filter(|v| v.is_finite()).map(|v| v as i64))
}

/// Text form of a JSON scalar; `None` for null, arrays and objects.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_status_from_online() {
        assert_eq!(DeviceStatus::from_online("online"), DeviceStatus::Running);
        assert_eq!(DeviceStatus::from_online("ack"), DeviceStatus::Stopped);
        assert_eq!(DeviceStatus::from_online("offline"), DeviceStatus::Offline);
        assert_eq!(DeviceStatus::from_online(""), DeviceStatus::Offline);
    }

    #[test]
    fn test_device_group_single_object_items() {
        let group: DeviceGroup = serde_json::from_value(json!({
            "items": { "id": 7, "name": "KA-01", "online": "ack" }
        }))
        .unwrap();

        assert_eq!(group.items.len(), 1);
        assert_eq!(group.items[0].id, "7");
        assert_eq!(group.items[0].status(), DeviceStatus::Stopped);
    }

    #[test]
    fn test_device_group_missing_items() {
        let group: DeviceGroup = serde_json::from_value(json!({ "title": "Ungrouped" })).unwrap();
        assert!(group.items.is_empty());
    }

    #[test]
    fn test_payload_accepts_php_empty_arrays() {
        let payload: RawSensorPayload = serde_json::from_value(json!({
            "sensors": {
                "1": { "values": [] },
                "2": { "values": { "a": { "t": 1, "v": "2" } } },
                "3": { "values": null }
            }
        }))
        .unwrap();

        assert_eq!(payload.sensors.len(), 3);
        assert_eq!(payload.entry_count(), 1);
    }

    #[test]
    fn test_report_response_into_payload() {
        let response: ReportResponse = serde_json::from_value(json!({
            "items": [{ "sensors": { "1": { "values": { "a": { "t": 1000, "v": "20.5" } } } } }],
            "url": "/reports/abc"
        }))
        .unwrap();

        let payload = response.into_payload().unwrap();
        assert_eq!(payload.entry_count(), 1);
    }

    #[test]
    fn test_report_response_without_sensors() {
        let response: ReportResponse =
            serde_json::from_value(json!({ "items": [{ "sensors": null }] })).unwrap();
        assert!(response.into_payload().is_none());

        let response: ReportResponse = serde_json::from_value(json!({ "items": [] })).unwrap();
        assert!(response.into_payload().is_none());
    }

    #[test]
    fn test_device_loose_numbers() {
        let device: Device = serde_json::from_value(json!({
            "id": "12",
            "name": "TN-09",
            "timestamp": "1704067200",
            "speed": 42.7,
            "stop_duration_sec": null
        }))
        .unwrap();

        assert_eq!(device.timestamp, Some(1_704_067_200));
        assert_eq!(device.speed, Some(42.7));
        assert_eq!(device.stop_duration_sec, None);
    }

    #[test]
    fn test_sensor_value_coercion() {
        let sensor = DeviceSensor {
            name: "Temperature".to_string(),
            kind: "temperature".to_string(),
            value: None,
            val: Some(json!(" 4.5 ")),
        };
        assert_eq!(sensor.val_number(), Some(4.5));
        assert!(!sensor.is_on());

        let ignition = DeviceSensor {
            val: Some(json!("true")),
            ..Default::default()
        };
        assert!(ignition.is_on());
    }
}
