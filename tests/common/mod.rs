//! Mock HTTP server setup for provider tests

#![allow(dead_code)]

use geo_batch::providers::{ElevationConfig, GeocoderConfig, NominatimGeocoder, OpenElevationProvider};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::time::Duration;

pub const USER_AGENT: &str = "geo-batch-tests/1.0";
pub const ELEVATION_PATH: &str = "/api/v1/lookup";

/// Test fixture that owns a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Geocoder pointed at the mock server, unthrottled unless `rps > 0`.
    pub fn geocoder(&self, rps: f64) -> NominatimGeocoder {
        NominatimGeocoder::new(
            GeocoderConfig::new(USER_AGENT)
                .with_base_url(self.base_url.clone())
                .with_requests_per_sec(rps)
                .with_timeout(Duration::from_secs(2)),
        )
        .expect("geocoder config is valid")
    }

    pub fn elevation(&self, rps: f64, admission_timeout: Duration) -> OpenElevationProvider {
        OpenElevationProvider::new(
            ElevationConfig::new()
                .with_base_url(format!("{}{}", self.base_url, ELEVATION_PATH))
                .with_requests_per_sec(rps)
                .with_timeout(Duration::from_secs(2))
                .with_admission_timeout(admission_timeout),
        )
        .expect("elevation config is valid")
    }

    /// Mock for `GET path` answering any query with a JSON body
    pub async fn mock_get_json(&mut self, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn mock_elevation(&mut self, body: &str) -> Mock {
        self.server
            .mock("POST", ELEVATION_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }
}
