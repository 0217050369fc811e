//! Client for the vehicle-tracking REST API.
//!
//! Every call carries `lang=en` and the caller's `user_api_hash`. Non-2xx
//! answers become [`FleetError::Upstream`] with the API's own `message` when
//! it sends one.
//!
//! # Endpoints
//!
//! - `get_devices`: device groups with live sensor values
//! - `user_client`: name of the account owner
//! - `address/reverse`: reverse geocoding
//! - `generate_report`: report generation (temperature reports use type 13)

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::DeviceSource;
use crate::error::{FleetError, Result};
use crate::model::{DeviceGroup, LocationAddress, ReportResponse, UserResponse};
use crate::request::ReportRequestDescriptor;

/// Base URL for the tracking API.
pub const TRACKING_API_BASE: &str = "https://track.onepointgps.com/api";

/// Client for the tracking API.
#[derive(Clone)]
pub struct TrackingClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for TrackingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl TrackingClient {
    /// Create a client against the production API.
    pub fn new() -> Self {
        Self::with_base_url(TRACKING_API_BASE)
    }

    /// Create a client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host of the base URL, used to pin the URL fetcher.
    pub fn host(&self) -> Option<String> {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(path, "Calling tracking API");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message);
            warn!(path, status = status.as_u16(), "Tracking API returned an error");
            return Err(FleetError::upstream(status.as_u16(), message));
        }

        Ok(response.json::<T>().await?)
    }

    fn credential(api_hash: &str) -> Vec<(&'static str, String)> {
        vec![
            ("lang", "en".to_string()),
            ("user_api_hash", api_hash.to_string()),
        ]
    }

    /// Fetch all device groups visible to the credential.
    pub async fn get_devices(&self, api_hash: &str) -> Result<Vec<DeviceGroup>> {
        self.get("get_devices", &Self::credential(api_hash)).await
    }

    /// Fetch the account owner's profile.
    pub async fn get_user(&self, api_hash: &str) -> Result<UserResponse> {
        self.get("user_client", &Self::credential(api_hash)).await
    }

    /// Resolve coordinates to a street address.
    pub async fn reverse_geocode(
        &self,
        api_hash: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<LocationAddress> {
        let mut query = Self::credential(api_hash);
        query.push(("lat", latitude.to_string()));
        query.push(("lon", longitude.to_string()));
        self.get("address/reverse", &query).await
    }

    /// Run a report described by `descriptor`.
    pub async fn generate_report(
        &self,
        descriptor: &ReportRequestDescriptor,
        api_hash: &str,
    ) -> Result<ReportResponse> {
        self.get("generate_report", &descriptor.query_pairs(api_hash))
            .await
    }

    /// URL of the report call, as shown to the user in the API details panel.
    pub fn report_url(&self, descriptor: &ReportRequestDescriptor, api_hash: &str) -> String {
        descriptor.url(&self.base_url, api_hash)
    }
}

impl DeviceSource for TrackingClient {
    async fn fetch_devices(&self, api_hash: &str) -> Result<Vec<DeviceGroup>> {
        self.get_devices(api_hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = TrackingClient::with_base_url("http://127.0.0.1:9000/api/");
        assert_eq!(client.base_url(), "http://127.0.0.1:9000/api");
        assert_eq!(client.host().as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_default_points_at_production() {
        let client = TrackingClient::default();
        assert_eq!(client.host().as_deref(), Some("track.onepointgps.com"));
    }
}
