//! 外部服务模块：地理编码与高程查询接口、HTTP 实现及批量查询。
//!
//! # Providers Module
//!
//! Lookup services behind small async traits, each implementation owning its
//! rate limiter and result caches.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Geocoder`] | Address → coordinates and back |
//! | [`ElevationProvider`] | Coordinates → meters above sea level |
//! | [`NominatimGeocoder`] | OpenStreetMap Nominatim over HTTP |
//! | [`OpenElevationProvider`] | Open-Elevation lookup API over HTTP |
//! | [`full_location`] | Reverse geocode plus elevation |
//! | [`batch_geocode`] and friends | The above, run on a [`crate::batch::BatchExecutor`] |
//!
//! ## Rate limiting
//!
//! Every provider call first waits for its limiter (bounded by the provider's
//! admission timeout). An HTTP 429 pauses that limiter for the `Retry-After`
//! period, one second when the header is absent. Failed calls are not retried.

mod batch;
mod location;
pub mod nominatim;
pub mod open_elevation;

use crate::resilience::RateLimiter;
use crate::types::{Location, Point};
use crate::{Error, ProviderErrorKind, Result};
use async_trait::async_trait;
use std::time::Duration;

pub use batch::{batch_elevation, batch_full_location, batch_geocode, batch_reverse_geocode};
pub use location::full_location;
pub use nominatim::{GeocoderConfig, NominatimGeocoder};
pub use open_elevation::{ElevationConfig, OpenElevationProvider};

/// Back-off applied when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Point>;

    async fn reverse_geocode(&self, point: Point) -> Result<Location>;
}

#[async_trait]
pub trait ElevationProvider: Send + Sync {
    /// Elevation in whole meters.
    async fn elevation(&self, point: Point) -> Result<i32>;
}

pub(crate) fn note_back_off(limiter: &RateLimiter, err: &Error) {
    if let Some(ProviderErrorKind::RateLimited { retry_after_secs }) = err.provider_kind() {
        let pause = retry_after_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_AFTER);
        limiter.pause_for(pause);
    }
}
