//! Batch lookups on a [`BatchExecutor`].
//!
//! Each provider call races the batch token, so once any lookup fails the
//! remaining in-flight calls give up with [`Error::Cancelled`] instead of
//! holding a rate limiter slot for results nobody will read.

use super::{full_location, ElevationProvider, Geocoder};
use crate::batch::{linear_tasks, BatchExecutor};
use crate::types::{Location, Point};
use crate::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

async fn until_cancelled<T>(
    token: CancellationToken,
    source: &'static str,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = token.cancelled() => Err(Error::cancelled(source)),
        out = work => out,
    }
}

/// Forward-geocode every address; output `i` belongs to `addresses[i]`.
pub async fn batch_geocode(
    executor: &BatchExecutor,
    geocoder: Arc<dyn Geocoder>,
    addresses: Vec<String>,
) -> Result<Vec<Point>> {
    executor
        .run_with_cancel(linear_tasks(addresses), move |address, token| {
            let geocoder = Arc::clone(&geocoder);
            async move {
                until_cancelled(token, "batch_geocode", geocoder.geocode(&address)).await
            }
        })
        .await
}

pub async fn batch_reverse_geocode(
    executor: &BatchExecutor,
    geocoder: Arc<dyn Geocoder>,
    points: Vec<Point>,
) -> Result<Vec<Location>> {
    executor
        .run_with_cancel(linear_tasks(points), move |point, token| {
            let geocoder = Arc::clone(&geocoder);
            async move {
                until_cancelled(token, "batch_reverse_geocode", geocoder.reverse_geocode(point))
                    .await
            }
        })
        .await
}

pub async fn batch_elevation(
    executor: &BatchExecutor,
    provider: Arc<dyn ElevationProvider>,
    points: Vec<Point>,
) -> Result<Vec<i32>> {
    executor
        .run_with_cancel(linear_tasks(points), move |point, token| {
            let provider = Arc::clone(&provider);
            async move { until_cancelled(token, "batch_elevation", provider.elevation(point)).await }
        })
        .await
}

/// [`full_location`] for every point.
pub async fn batch_full_location(
    executor: &BatchExecutor,
    geocoder: Arc<dyn Geocoder>,
    elevation: Arc<dyn ElevationProvider>,
    points: Vec<Point>,
) -> Result<Vec<Location>> {
    executor
        .run_with_cancel(linear_tasks(points), move |point, token| {
            let geocoder = Arc::clone(&geocoder);
            let elevation = Arc::clone(&elevation);
            async move {
                until_cancelled(
                    token,
                    "batch_full_location",
                    full_location(point, geocoder.as_ref(), elevation.as_ref()),
                )
                .await
            }
        })
        .await
}
