//! 缓存模块：提供带 TTL 的并发安全内存缓存与单飞（single-flight）查询。
//!
//! # Lookup Caching Module
//!
//! Providers reuse prior results for a bounded time instead of repeating slow,
//! throttled external calls.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TtlCache`] | Reader/writer-locked map with per-entry expiry and a background sweep |
//! | [`LookupCache`] | `TtlCache` plus single-flight de-duplication of concurrent misses |
//! | [`CacheKey`] | Canonical keys for addresses and coordinates |
//! | [`CacheConfig`] | TTL and sweep period |
//!
//! ## Expiry
//!
//! An entry is readable while `now < expires_at`. Reads past expiry are misses
//! even if the sweep has not yet removed the entry. The sweep runs on the ambient
//! Tokio runtime and ends when the cache is dropped or [`TtlCache::stop`] is called.
//!
//! ## Example
//!
//! ```rust
//! use geo_batch::cache::{CacheKey, LookupCache};
//! use std::time::Duration;
//!
//! # #[tokio::main] async fn main() -> geo_batch::Result<()> {
//! let cache: LookupCache<i32> = LookupCache::new(Duration::from_secs(60));
//! let key = CacheKey::new("answer");
//! let v = cache.get_or_load(&key, || async { Ok(42) }).await?;
//! assert_eq!(v, 42);
//! # Ok(()) }
//! ```

mod flight;
mod key;
mod ttl;

pub use flight::{LookupCache, LookupStats};
pub use key::CacheKey;
pub use ttl::{CacheConfig, CacheStats, TtlCache, DEFAULT_SWEEP_INTERVAL};
