//! Google Geocoding API client
//!
//! `GET {base_url}?address=..&key=..` and take the first result's
//! `geometry.location`. Any non-`OK` answer becomes `DomainError::Geocode`;
//! upstream details are logged, not returned to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::application::ports::AddressResolver;
use crate::domain::{Coordinates, DomainError, DomainResult};

pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

const NO_MATCH: &str = "Could not find location for address entered.";
const UNAVAILABLE: &str = "Geocoding service is unavailable, please try again later.";

#[derive(Debug, Clone)]
pub struct GoogleGeocoderConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl Default for GoogleGeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOCODE_URL.to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

pub struct GoogleGeocoder {
    client: Client,
    config: GoogleGeocoderConfig,
}

impl GoogleGeocoder {
    pub fn new(config: GoogleGeocoderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build geocoder HTTP client, using defaults");
                Client::new()
            });
        Self { client, config }
    }
}

#[async_trait]
impl AddressResolver for GoogleGeocoder {
    async fn resolve(&self, address: &str) -> DomainResult<Coordinates> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("address", address), ("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Geocoding request failed");
                DomainError::Geocode(UNAVAILABLE.into())
            })?;

        let http_status = response.status();
        if !http_status.is_success() {
            warn!(status = %http_status, "Geocoding service returned an error status");
            return Err(DomainError::Geocode(UNAVAILABLE.into()));
        }

        let body: GeocodeResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Geocoding response could not be decoded");
            DomainError::Geocode(UNAVAILABLE.into())
        })?;

        match body.status.as_str() {
            "OK" => match body.results.into_iter().next() {
                Some(first) => {
                    let location = first.geometry.location;
                    debug!(lat = location.lat, lng = location.lng, "Address resolved");
                    Ok(Coordinates::new(location.lat, location.lng))
                }
                None => Err(DomainError::Geocode(NO_MATCH.into())),
            },
            "ZERO_RESULTS" => Err(DomainError::Geocode(NO_MATCH.into())),
            other => {
                warn!(
                    status = other,
                    detail = body.error_message.as_deref().unwrap_or(""),
                    "Geocoding service rejected the request"
                );
                Err(DomainError::Geocode(UNAVAILABLE.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    fn geocoder(server: &MockServer) -> GoogleGeocoder {
        GoogleGeocoder::new(GoogleGeocoderConfig {
            base_url: server.url("/geocode/json"),
            api_key: "test-key".into(),
            request_timeout: Duration::from_secs(5),
        })
    }

    #[tokio::test]
    async fn test_resolves_first_result() {
        let server = MockServer::start_async().await;
        let api_mock = server.mock_async(|when, then| {
            when.method(GET)
                .path("/geocode/json")
                .query_param("address", "1600 Amphitheatre Parkway")
                .query_param("key", "test-key");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "status": "OK",
                    "results": [
                        {"geometry": {"location": {"lat": 37.4224, "lng": -122.0841}}},
                        {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
                    ]
                }));
        })
        .await;

        let coords = geocoder(&server)
            .resolve("1600 Amphitheatre Parkway")
            .await
            .unwrap();

        api_mock.assert_async().await;
        assert_eq!(coords, Coordinates::new(37.4224, -122.0841));
    }

    #[tokio::test]
    async fn test_zero_results_is_geocode_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/geocode/json");
            then.status(200)
                .json_body(serde_json::json!({"status": "ZERO_RESULTS", "results": []}));
        })
        .await;

        let err = geocoder(&server).resolve("Nowhere").await.unwrap_err();
        assert_eq!(err, DomainError::Geocode(NO_MATCH.into()));
    }

    #[tokio::test]
    async fn test_denied_request_is_geocode_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/geocode/json");
            then.status(200).json_body(serde_json::json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            }));
        })
        .await;

        let err = geocoder(&server).resolve("Anywhere").await.unwrap_err();
        assert_eq!(err, DomainError::Geocode(UNAVAILABLE.into()));
    }

    #[tokio::test]
    async fn test_server_error_is_geocode_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/geocode/json");
            then.status(500).body("upstream exploded");
        })
        .await;

        let err = geocoder(&server).resolve("Anywhere").await.unwrap_err();
        assert!(matches!(err, DomainError::Geocode(_)));
    }

    #[tokio::test]
    async fn test_garbage_body_is_geocode_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/geocode/json");
            then.status(200).body("not json");
        })
        .await;

        let err = geocoder(&server).resolve("Anywhere").await.unwrap_err();
        assert!(matches!(err, DomainError::Geocode(_)));
    }
}
