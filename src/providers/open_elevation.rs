//! Open-Elevation lookup API.

use super::{note_back_off, ElevationProvider};
use crate::cache::{CacheConfig, CacheKey, LookupCache, LookupStats, DEFAULT_SWEEP_INTERVAL};
use crate::resilience::RateLimiter;
use crate::transport::{HttpTransport, HttpTransportConfig};
use crate::types::Point;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const PROVIDER: &str = "open-elevation";
pub const DEFAULT_BASE_URL: &str = "https://api.open-elevation.com/api/v1/lookup";

#[derive(Debug, Clone)]
pub struct ElevationConfig {
    /// Full lookup endpoint; requests are POSTed here.
    pub base_url: String,
    pub requests_per_sec: f64,
    pub timeout: Duration,
    /// Longest wait for a rate limiter token before failing with an admission timeout.
    pub admission_timeout: Duration,
    pub cache_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_sec: 5.0,
            timeout: Duration::from_secs(10),
            admission_timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ElevationConfig {
    pub fn new() -> Self {
        Self::default()
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

    pub fn with_admission_timeout(mut self, timeout: Duration) -> Self {
        self.admission_timeout = timeout;
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
        if url::Url::parse(&self.base_url).is_err() {
            return Err(Error::configuration_with_context(
                format!("invalid base url '{}'", self.base_url),
                ErrorContext::new()
                    .with_field_path("elevation.base_url")
                    .with_source(PROVIDER),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct LookupRequest {
    locations: Vec<LookupLocation>,
}

#[derive(Debug, Serialize)]
struct LookupLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    elevation: f64,
}

struct Client {
    transport: HttpTransport,
    limiter: RateLimiter,
    url: String,
    admission_timeout: Duration,
}

impl Client {
    async fn lookup(&self, p: Point) -> Result<i32> {
        self.limiter.admit_within(self.admission_timeout).await?;
        debug!(provider = PROVIDER, point = %p, "elevation request");
        let body = LookupRequest {
            locations: vec![LookupLocation {
                latitude: p.lat,
                longitude: p.lon,
            }],
        };
        let resp: LookupResponse = self
            .transport
            .post_json(&self.url, &body)
            .await
            .map_err(|e| {
                note_back_off(&self.limiter, &e);
                e
            })?;
        let first = resp
            .results
            .first()
            .ok_or_else(|| Error::not_found(PROVIDER, format!("elevation not found at {}", p)))?;
        Ok(first.elevation.round() as i32)
    }
}

/// Open-Elevation-backed [`ElevationProvider`] with its own rate limiter and cache.
pub struct OpenElevationProvider {
    client: Arc<Client>,
    cache: LookupCache<i32>,
}

impl OpenElevationProvider {
    pub fn new(config: ElevationConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(
            PROVIDER,
            HttpTransportConfig::new(config.timeout).with_env(),
        )?;
        let limiter = RateLimiter::per_second(config.requests_per_sec)?;
        Ok(Self {
            client: Arc::new(Client {
                transport,
                limiter,
                url: config.base_url.clone(),
                admission_timeout: config.admission_timeout,
            }),
            cache: LookupCache::with_config(
                CacheConfig::new(config.cache_ttl).with_sweep_interval(config.sweep_interval),
            ),
        })
    }

    pub fn stats(&self) -> LookupStats {
        self.cache.stats()
    }

    pub fn in_flight(&self) -> usize {
        self.cache.in_flight()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.client.limiter
    }
}

#[async_trait]
impl ElevationProvider for OpenElevationProvider {
    async fn elevation(&self, point: Point) -> Result<i32> {
        point.validate()?;
        let client = Arc::clone(&self.client);
        self.cache
            .get_or_load(&CacheKey::elevation(point), move || async move {
                client.lookup(point).await
            })
            .await
    }
}
