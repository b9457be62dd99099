//! OpenStreetMap Nominatim geocoder.

use super::{note_back_off, Geocoder};
use crate::cache::{CacheConfig, CacheKey, LookupCache, LookupStats, DEFAULT_SWEEP_INTERVAL};
use crate::resilience::RateLimiter;
use crate::transport::{HttpTransport, HttpTransportConfig};
use crate::types::{Location, Point};
use crate::{Error, ErrorContext, ProviderErrorKind, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const PROVIDER: &str = "nominatim";
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Sent as `User-Agent`; Nominatim's usage policy requires one identifying the application.
    pub user_agent: String,
    pub base_url: String,
    pub requests_per_sec: f64,
    /// HTTP timeout; also bounds the wait for a rate limiter token.
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub sweep_interval: Duration,
}

impl GeocoderConfig {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_sec: 1.0,
            timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_requests_per_sec(mut self, rps: f64) -> Self {
        self.requests_per_sec = rps;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "user agent must not be empty",
                ErrorContext::new()
                    .with_field_path("geocoder.user_agent")
                    .with_source(PROVIDER),
            ));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(Error::configuration_with_context(
                format!("invalid base url '{}'", self.base_url),
                ErrorContext::new()
                    .with_field_path("geocoder.base_url")
                    .with_source(PROVIDER),
            ));
        }
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReverseAddress {
    country: String,
    city: String,
    town: String,
    village: String,
    road: String,
    house_number: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<ReverseAddress>,
    #[serde(default)]
    error: Option<String>,
}

struct Client {
    transport: HttpTransport,
    limiter: RateLimiter,
    search_url: String,
    reverse_url: String,
    admission_timeout: Duration,
}

impl Client {
    async fn call<T, Fut>(&self, request: Fut) -> Result<T>
    where
        Fut: std::future::Future<Output = Result<T>>,
    {
        self.limiter.admit_within(self.admission_timeout).await?;
        let out = request.await;
        if let Err(e) = &out {
            note_back_off(&self.limiter, e);
        }
        out
    }

    async fn search(&self, address: String) -> Result<Point> {
        debug!(provider = PROVIDER, address = %address, "geocode request");
        let query = [
            ("q", address.clone()),
            ("format", "json".to_string()),
            ("limit", "1".to_string()),
        ];
        let hits: Vec<SearchHit> = self
            .call(self.transport.get_json(&self.search_url, &query))
            .await?;
        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(PROVIDER, format!("address not found: {}", address)))?;
        Ok(Point::new(parse_coord(&hit.lat)?, parse_coord(&hit.lon)?))
    }

    async fn reverse(&self, p: Point) -> Result<Location> {
        debug!(provider = PROVIDER, point = %p, "reverse geocode request");
        let query = [
            ("lat", format!("{:.6}", p.lat)),
            ("lon", format!("{:.6}", p.lon)),
            ("format", "json".to_string()),
        ];
        let resp: ReverseResponse = self
            .call(self.transport.get_json(&self.reverse_url, &query))
            .await?;
        let addr = match (resp.address, resp.error) {
            (Some(addr), _) => addr,
            (None, err) => {
                return Err(Error::not_found(
                    PROVIDER,
                    err.unwrap_or_else(|| format!("no address at {}", p)),
                ))
            }
        };

        let city = [addr.city, addr.town, addr.village]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or_default();
        let address = [addr.road, addr.house_number]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(Location {
            country: addr.country,
            city,
            address,
            lat: p.lat,
            lon: p.lon,
            ..Location::default()
        })
    }
}

fn parse_coord(raw: &str) -> Result<f64> {
    raw.trim().parse::<f64>().map_err(|_| {
        Error::provider(
            PROVIDER,
            ProviderErrorKind::Parse,
            format!("invalid coordinate '{}'", raw),
        )
    })
}

/// Nominatim-backed [`Geocoder`] with its own rate limiter and result caches.
pub struct NominatimGeocoder {
    client: Arc<Client>,
    forward: LookupCache<Point>,
    reverse: LookupCache<Location>,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(
            PROVIDER,
            HttpTransportConfig::new(config.timeout)
                .with_user_agent(config.user_agent.clone())
                .with_env(),
        )?;
        let limiter = RateLimiter::per_second(config.requests_per_sec)?;
        let cache = CacheConfig::new(config.cache_ttl).with_sweep_interval(config.sweep_interval);
        Ok(Self {
            client: Arc::new(Client {
                transport,
                limiter,
                search_url: config.endpoint("search"),
                reverse_url: config.endpoint("reverse"),
                admission_timeout: config.timeout,
            }),
            forward: LookupCache::with_config(cache.clone()),
            reverse: LookupCache::with_config(cache),
        })
    }

    pub fn forward_stats(&self) -> LookupStats {
        self.forward.stats()
    }

    pub fn reverse_stats(&self) -> LookupStats {
        self.reverse.stats()
    }

    /// Lookups currently loading, forward and reverse combined.
    pub fn in_flight(&self) -> usize {
        self.forward.in_flight() + self.reverse.in_flight()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.client.limiter
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Point> {
        let client = Arc::clone(&self.client);
        let address = address.to_string();
        self.forward
            .get_or_load(&CacheKey::address(&address), move || async move {
                client.search(address).await
            })
            .await
    }

    async fn reverse_geocode(&self, point: Point) -> Result<Location> {
        point.validate()?;
        let client = Arc::clone(&self.client);
        self.reverse
            .get_or_load(&CacheKey::reverse(point), move || async move {
                client.reverse(point).await
            })
            .await
    }
}
