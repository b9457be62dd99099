//! Point-in-polygon tests.

use crate::batch::BatchExecutor;
use crate::types::Point;
use crate::Result;
use std::sync::Arc;

/// Ray casting over (lat, lon) treated as planar coordinates.
///
/// Polygons with fewer than three vertices contain nothing. Points exactly on an
/// edge may land on either side.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (vi, vj) = (polygon[i], polygon[j]);
        if (vi.lon > p.lon) != (vj.lon > p.lon)
            && p.lat < (vj.lat - vi.lat) * (p.lon - vi.lon) / (vj.lon - vi.lon) + vi.lat
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// The points inside `polygon`, in their input order.
pub async fn filter_points_in_polygon(
    executor: &BatchExecutor,
    points: Vec<Point>,
    polygon: Vec<Point>,
) -> Result<Vec<Point>> {
    let polygon = Arc::new(polygon);
    let kept = executor
        .run_linear(points, move |p| {
            let inside = point_in_polygon(p, &polygon);
            async move { Ok(inside.then_some(p)) }
        })
        .await?;
    Ok(kept.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        ]
    }

    #[test]
    fn test_inside_and_outside() {
        assert!(point_in_polygon(Point::new(5.0, 5.0), &square()));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &square()));
        assert!(!point_in_polygon(Point::new(5.0, -1.0), &square()));
    }

    #[test]
    fn test_degenerate_polygon_contains_nothing() {
        let line = vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        assert!(!point_in_polygon(Point::new(5.0, 5.0), &line));
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &[]));
    }

    #[tokio::test]
    async fn test_filter_keeps_input_order() {
        let exec = BatchExecutor::with_concurrency(3);
        let pts = vec![
            Point::new(9.0, 9.0),
            Point::new(20.0, 20.0),
            Point::new(1.0, 1.0),
            Point::new(5.0, 5.0),
        ];
        let inside = filter_points_in_polygon(&exec, pts, square()).await.unwrap();
        assert_eq!(
            inside,
            vec![Point::new(9.0, 9.0), Point::new(1.0, 1.0), Point::new(5.0, 5.0)]
        );
    }
}
