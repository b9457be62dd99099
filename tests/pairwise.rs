use geo_batch::batch::{pair_count, BatchExecutor};
use geo_batch::geometry::{distance_matrix, haversine_km};
use geo_batch::{Error, Point};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn cities() -> Vec<Point> {
    vec![
        Point::new(52.5200, 13.4050),  // Berlin
        Point::new(48.8566, 2.3522),   // Paris
        Point::new(38.7223, -9.1393),  // Lisbon
        Point::new(55.7558, 37.6173),  // Moscow
        Point::new(41.9028, 12.4964),  // Rome
    ]
}

#[tokio::test]
async fn test_matrix_is_symmetric_with_zero_diagonal() {
    let exec = BatchExecutor::with_concurrency(3);
    let m = distance_matrix(&exec, cities(), haversine_km).await.unwrap();
    assert_eq!(m.len(), 5);
    for i in 0..5 {
        assert_eq!(m[i].len(), 5);
        assert_eq!(m[i][i], 0.0);
        for j in 0..5 {
            assert_eq!(m[i][j], m[j][i]);
        }
    }
    // Berlin to Paris is about 878 km.
    assert!((m[0][1] - 878.0).abs() < 10.0, "got {}", m[0][1]);
}

#[tokio::test]
async fn test_diagonal_never_dispatched() {
    let calls = Arc::new(AtomicUsize::new(0));
    let exec = BatchExecutor::with_concurrency(4);
    let c = calls.clone();
    let m = exec
        .run_pairwise(cities(), move |a: Point, b: Point| {
            c.fetch_add(1, Ordering::SeqCst);
            async move {
                if a == b {
                    return Err(Error::runtime("diagonal dispatched"));
                }
                Ok(haversine_km(a, b))
            }
        })
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), pair_count(5));
    assert_eq!(m[4][4], 0.0);
}

#[tokio::test]
async fn test_single_point_matrix() {
    let exec = BatchExecutor::new();
    let m = distance_matrix(&exec, vec![Point::new(1.0, 1.0)], haversine_km)
        .await
        .unwrap();
    assert_eq!(m, vec![vec![0.0]]);
    let empty = distance_matrix(&exec, Vec::new(), haversine_km).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_pairwise_failure_is_fatal() {
    let exec = BatchExecutor::with_concurrency(2);
    let err = exec
        .run_pairwise(vec![1u32, 2, 3], |a, b| async move {
            if a + b == 5 {
                Err(Error::runtime("bad pair"))
            } else {
                Ok(a + b)
            }
        })
        .await
        .unwrap_err();
    // Pairs are (0,1), (0,2), (1,2); values 2+3 belong to the last.
    assert_eq!(err.task_index(), Some(2));
}
