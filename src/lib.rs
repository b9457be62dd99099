//! # geo-batch
//!
//! 面向慢速、限流外部服务的地理批量查询库：有界并发执行、有序快速失败收集、TTL 缓存与令牌桶限流。
//!
//! Bounded-concurrency batch lookups (geocoding, elevation, pairwise distance,
//! polygon membership) against slow or externally throttled providers.
//!
//! ## Overview
//!
//! A batch is a list of independent tasks. The executor fans them out over a
//! fixed number of Tokio workers, each of which calls a work function. Work
//! functions built on the providers check a TTL cache, wait for a rate limiter
//! token and only then call the remote service. Results come back in the
//! caller's original order, or the batch fails fast with the first error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geo_batch::providers::{batch_geocode, GeocoderConfig, NominatimGeocoder};
//! use geo_batch::BatchExecutor;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> geo_batch::Result<()> {
//!     let geocoder = Arc::new(NominatimGeocoder::new(GeocoderConfig::new("my-app/1.0"))?);
//!     let exec = BatchExecutor::with_concurrency(4);
//!
//!     let points = batch_geocode(
//!         &exec,
//!         geocoder,
//!         vec!["Berlin".into(), "Lisbon".into()],
//!     )
//!     .await?;
//!     println!("{:?}", points);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batch`] | Bounded executor, ordered collector, task enumeration |
//! | [`cache`] | TTL cache with background sweep, single-flight lookups |
//! | [`resilience`] | Token-bucket rate limiter |
//! | [`geometry`] | Haversine distance, point-in-polygon, their batch forms |
//! | [`providers`] | Geocoder / elevation traits and HTTP implementations |
//! | [`transport`] | JSON HTTP client with provider error mapping |
//! | [`config`] | YAML + environment configuration |
//! | [`types`] | `Point`, `Location` |

pub mod batch;
pub mod cache;
pub mod config;
pub mod geometry;
pub mod providers;
pub mod resilience;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use batch::{BatchConfig, BatchExecutor};
pub use cache::{CacheKey, LookupCache, TtlCache};
pub use config::GeoBatchConfig;
pub use providers::{ElevationProvider, Geocoder};
pub use resilience::RateLimiter;
pub use types::{Location, Point};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ProviderErrorKind};
