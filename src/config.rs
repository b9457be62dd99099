//! Crate-level configuration: YAML file plus `GEO_BATCH_*` environment overrides.

use crate::batch::{BatchConfig, BatchExecutor, CONCURRENCY_ENV};
use crate::cache::DEFAULT_SWEEP_INTERVAL;
use crate::providers::{
    nominatim, open_elevation, ElevationConfig, GeocoderConfig, NominatimGeocoder,
    OpenElevationProvider,
};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT_ENV: &str = "GEO_BATCH_USER_AGENT";
pub const GEOCODER_RPS_ENV: &str = "GEO_BATCH_GEOCODER_RPS";
pub const ELEVATION_RPS_ENV: &str = "GEO_BATCH_ELEVATION_RPS";
pub const CACHE_SWEEP_ENV: &str = "GEO_BATCH_CACHE_SWEEP_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub sweep_interval_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSection {
    pub user_agent: String,
    pub base_url: String,
    pub requests_per_sec: f64,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for GeocoderSection {
    fn default() -> Self {
        Self {
            user_agent: format!("geo-batch/{}", env!("CARGO_PKG_VERSION")),
            base_url: nominatim::DEFAULT_BASE_URL.to_string(),
            requests_per_sec: 1.0,
            timeout_secs: 10,
            cache_ttl_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationSection {
    pub base_url: String,
    pub requests_per_sec: f64,
    pub timeout_secs: u64,
    pub admission_timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for ElevationSection {
    fn default() -> Self {
        Self {
            base_url: open_elevation::DEFAULT_BASE_URL.to_string(),
            requests_per_sec: 5.0,
            timeout_secs: 10,
            admission_timeout_secs: 5,
            cache_ttl_secs: 30 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoBatchConfig {
    /// Worker count; `None` uses [`crate::batch::default_concurrency`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    pub cache: CacheSection,
    pub geocoder: GeocoderSection,
    pub elevation: ElevationSection,
}

impl GeoBatchConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid YAML configuration: {}", e),
                ErrorContext::new().with_source("config"),
            )
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loaded configuration file");
        Self::from_yaml_str(&raw).map_err(|e| match e {
            Error::Configuration { message, context } => {
                let details = match &context.details {
                    Some(d) => format!("{}; file: {}", d, path.display()),
                    None => format!("file: {}", path.display()),
                };
                Error::Configuration {
                    message,
                    context: context.with_details(details),
                }
            }
            other => other,
        })
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env()
    }

    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_from(|k| std::env::var(k).ok())
    }

    /// Apply `GEO_BATCH_*` overrides read through `lookup`, then validate.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(n) = parse_env::<usize>(&lookup, CONCURRENCY_ENV, "concurrency")? {
            self.concurrency = Some(n);
        }
        if let Some(ua) = lookup(USER_AGENT_ENV) {
            self.geocoder.user_agent = ua;
        }
        if let Some(rps) = parse_env::<f64>(&lookup, GEOCODER_RPS_ENV, "geocoder.requests_per_sec")? {
            self.geocoder.requests_per_sec = rps;
        }
        if let Some(rps) = parse_env::<f64>(&lookup, ELEVATION_RPS_ENV, "elevation.requests_per_sec")? {
            self.elevation.requests_per_sec = rps;
        }
        if let Some(secs) = parse_env::<u64>(&lookup, CACHE_SWEEP_ENV, "cache.sweep_interval_secs")? {
            self.cache.sweep_interval_secs = secs;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == Some(0) {
            return Err(invalid("concurrency", "must be greater than zero"));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(invalid("cache.sweep_interval_secs", "must be greater than zero"));
        }
        check_rate("geocoder.requests_per_sec", self.geocoder.requests_per_sec)?;
        check_rate("elevation.requests_per_sec", self.elevation.requests_per_sec)?;
        self.geocoder_config().validate()?;
        self.elevation_config().validate()?;
        Ok(())
    }

    pub fn batch_config(&self) -> BatchConfig {
        match self.concurrency {
            Some(n) => BatchConfig::new().with_concurrency(n),
            None => BatchConfig::new(),
        }
    }

    pub fn executor(&self) -> BatchExecutor {
        BatchExecutor::with_config(self.batch_config())
    }

    fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_secs)
    }

    pub fn geocoder_config(&self) -> GeocoderConfig {
        let g = &self.geocoder;
        GeocoderConfig::new(g.user_agent.clone())
            .with_base_url(g.base_url.clone())
            .with_requests_per_sec(g.requests_per_sec)
            .with_timeout(Duration::from_secs(g.timeout_secs))
            .with_cache_ttl(Duration::from_secs(g.cache_ttl_secs))
            .with_sweep_interval(self.sweep_interval())
    }

    pub fn elevation_config(&self) -> ElevationConfig {
        let e = &self.elevation;
        ElevationConfig::new()
            .with_base_url(e.base_url.clone())
            .with_requests_per_sec(e.requests_per_sec)
            .with_timeout(Duration::from_secs(e.timeout_secs))
            .with_admission_timeout(Duration::from_secs(e.admission_timeout_secs))
            .with_cache_ttl(Duration::from_secs(e.cache_ttl_secs))
            .with_sweep_interval(self.sweep_interval())
    }

    pub fn build_geocoder(&self) -> Result<NominatimGeocoder> {
        NominatimGeocoder::new(self.geocoder_config())
    }

    pub fn build_elevation(&self) -> Result<OpenElevationProvider> {
        OpenElevationProvider::new(self.elevation_config())
    }
}

fn invalid(field: &str, details: &str) -> Error {
    Error::configuration_with_context(
        format!("invalid value for {}", field),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(details)
            .with_source("config"),
    )
}

fn check_rate(field: &str, rps: f64) -> Result<()> {
    if !rps.is_finite() || rps < 0.0 {
        return Err(invalid(field, "expected a finite, non-negative rate"));
    }
    Ok(())
}

fn parse_env<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    field: &str,
) -> Result<Option<T>> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            Error::configuration_with_context(
                format!("invalid {}: '{}'", var, raw),
                ErrorContext::new()
                    .with_field_path(field)
                    .with_source("env"),
            )
        }),
    }
}
