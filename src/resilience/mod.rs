//! 弹性模块：提供令牌桶限流器，作为外部服务调用的准入闸门。
//!
//! # Resilience Module
//!
//! External geocoding and elevation services publish request-rate policies. Each
//! provider owns one [`RateLimiter`] that every one of its calls passes through,
//! regardless of how many batch workers are running.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`rate_limiter`] | Token bucket with deadline-bounded admission and external back-off |
//!
//! ## Rate Limiter
//!
//! ```rust
//! use geo_batch::resilience::rate_limiter::RateLimiter;
//! use std::time::Duration;
//!
//! # #[tokio::main] async fn main() -> geo_batch::Result<()> {
//! let limiter = RateLimiter::per_second(5.0)?;
//! limiter.admit_within(Duration::from_secs(5)).await?;
//! // Make the call...
//! # Ok(()) }
//! ```
//!
//! A zero rate disables throttling; the limiter then only honours
//! [`RateLimiter::pause_for`] back-offs.

pub mod rate_limiter;

pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterSnapshot};
