//! Google Geocoding client for municipality lookup

use async_trait::async_trait;
use roadit_common::Location;
use serde::Deserialize;
use std::time::Duration;

use super::{GatewayError, MunicipalityResolver};

const GEOCODING_BASE_URL: &str = "https://maps.googleapis.com";
const USER_AGENT: &str = concat!("roadit-server/", env!("CARGO_PKG_VERSION"));

/// Name returned when the coordinates match nothing
pub const UNKNOWN_MUNICIPALITY: &str = "Unknown";

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    #[serde(default)]
    pub formatted_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Municipality name from a geocoding response
///
/// First result's locality (or second-level administrative area), then its
/// formatted address, then [`UNKNOWN_MUNICIPALITY`].
pub fn municipality_from_response(response: &GeocodeResponse) -> Result<String, GatewayError> {
    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(UNKNOWN_MUNICIPALITY.to_string()),
        other => {
            return Err(GatewayError::Api(format!(
                "geocoding status {}{}",
                other,
                response
                    .error_message
                    .as_deref()
                    .map(|m| format!(" ({})", m))
                    .unwrap_or_default()
            )))
        }
    }

    let Some(first) = response.results.first() else {
        return Ok(UNKNOWN_MUNICIPALITY.to_string());
    };

    let locality = first.address_components.iter().find(|c| {
        c.types
            .iter()
            .any(|t| t == "locality" || t == "administrative_area_level_2")
    });

    match locality {
        Some(component) => Ok(component.long_name.clone()),
        None if !first.formatted_address.trim().is_empty() => Ok(first.formatted_address.clone()),
        None => Ok(UNKNOWN_MUNICIPALITY.to_string()),
    }
}

/// Municipality resolver backed by reverse geocoding
pub struct GeocodingResolver {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeocodingResolver {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: GEOCODING_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (a local stand-in during tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl MunicipalityResolver for GeocodingResolver {
    fn name(&self) -> &'static str {
        "geocoding"
    }

    async fn resolve(&self, location: Location) -> Result<String, GatewayError> {
        let latlng = format!("{},{}", location.lat, location.lng);
        tracing::debug!(latlng = %latlng, "Reverse geocoding");

        let response = self
            .http_client
            .get(format!("{}/maps/api/geocode/json", self.base_url))
            .query(&[("latlng", latlng.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Geocoding API error: {}", error_text);
            return Err(GatewayError::Api(format!("HTTP {}", status.as_u16())));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        let name = municipality_from_response(&body).map_err(|e| {
            tracing::warn!("Geocoding failed: {}", e);
            e
        })?;
        tracing::info!(latlng = %latlng, municipality = %name, "Municipality resolved");
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> GeocodeResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_locality_preferred() {
        let response = parse(serde_json::json!({
            "status": "OK",
            "results": [{
                "address_components": [
                    { "long_name": "Connaught Place", "types": ["sublocality"] },
                    { "long_name": "New Delhi", "types": ["locality", "political"] }
                ],
                "formatted_address": "Connaught Place, New Delhi, Delhi 110001, India"
            }]
        }));
        assert_eq!(municipality_from_response(&response).unwrap(), "New Delhi");
    }

    #[test]
    fn test_admin_area_level_2_accepted() {
        let response = parse(serde_json::json!({
            "status": "OK",
            "results": [{
                "address_components": [
                    { "long_name": "Mumbai Suburban", "types": ["administrative_area_level_2"] }
                ],
                "formatted_address": "Andheri, Mumbai"
            }]
        }));
        assert_eq!(municipality_from_response(&response).unwrap(), "Mumbai Suburban");
    }

    #[test]
    fn test_formatted_address_fallback() {
        let response = parse(serde_json::json!({
            "status": "OK",
            "results": [{
                "address_components": [{ "long_name": "India", "types": ["country"] }],
                "formatted_address": "Somewhere, India"
            }]
        }));
        assert_eq!(municipality_from_response(&response).unwrap(), "Somewhere, India");
    }

    #[test]
    fn test_no_results_is_unknown() {
        let zero = parse(serde_json::json!({ "status": "ZERO_RESULTS", "results": [] }));
        assert_eq!(municipality_from_response(&zero).unwrap(), UNKNOWN_MUNICIPALITY);

        let empty_ok = parse(serde_json::json!({ "status": "OK", "results": [] }));
        assert_eq!(municipality_from_response(&empty_ok).unwrap(), UNKNOWN_MUNICIPALITY);
    }

    #[test]
    fn test_error_status_is_api_error() {
        let denied = parse(serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }));
        let err = municipality_from_response(&denied).unwrap_err();
        assert!(matches!(err, GatewayError::Api(ref m) if m.contains("REQUEST_DENIED")));
    }
}
