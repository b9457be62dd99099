//! Great-circle distance on a spherical earth.

use crate::batch::BatchExecutor;
use crate::types::Point;
use crate::Result;
use std::sync::Arc;

/// Mean earth radius used by [`haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between `a` and `b` in kilometres.
pub fn haversine_km(a: Point, b: Point) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Symmetric `n × n` matrix of `distance(points[i], points[j])`, zero on the diagonal.
///
/// Only the upper triangle is computed.
pub async fn distance_matrix<F>(
    executor: &BatchExecutor,
    points: Vec<Point>,
    distance: F,
) -> Result<Vec<Vec<f64>>>
where
    F: Fn(Point, Point) -> f64 + Send + Sync + 'static,
{
    let distance = Arc::new(distance);
    executor
        .run_pairwise(points, move |a, b| {
            let d = distance(a, b);
            async move { Ok(d) }
        })
        .await
}
