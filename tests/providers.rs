mod common;

use common::{MockServerFixture, ELEVATION_PATH, USER_AGENT};
use geo_batch::batch::BatchExecutor;
use geo_batch::providers::{
    batch_elevation, batch_full_location, batch_geocode, full_location, ElevationProvider,
    Geocoder,
};
use geo_batch::{Point, ProviderErrorKind};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const BERLIN_SEARCH: &str = r#"[{"place_id":1,"lat":"52.5170365","lon":"13.3888599","display_name":"Berlin, Deutschland"}]"#;

const BERLIN_REVERSE: &str = r#"{
    "place_id": 2,
    "lat": "52.5163",
    "lon": "13.3777",
    "address": {
        "house_number": "77",
        "road": "Unter den Linden",
        "city": "Berlin",
        "postcode": "10117",
        "country": "Deutschland"
    }
}"#;

#[tokio::test]
async fn test_geocode_parses_and_caches() {
    let mut fx = MockServerFixture::new().await;
    let mock = fx
        .server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "Berlin".into()),
            Matcher::UrlEncoded("format".into(), "json".into()),
            Matcher::UrlEncoded("limit".into(), "1".into()),
        ]))
        .match_header("user-agent", USER_AGENT)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(BERLIN_SEARCH)
        .expect(1)
        .create_async()
        .await;

    let geocoder = fx.geocoder(0.0);
    let first = geocoder.geocode("Berlin").await.unwrap();
    let second = geocoder.geocode("Berlin").await.unwrap();
    assert_eq!(first, Point::new(52.5170365, 13.3888599));
    assert_eq!(first, second);
    assert_eq!(geocoder.forward_stats().loads, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_geocode_empty_result_is_not_found() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx.mock_get_json("/search", 200, "[]").await;
    let err = fx.geocoder(0.0).geocode("Atlantis").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Atlantis"));
}

#[tokio::test]
async fn test_reverse_geocode_builds_location() {
    let mut fx = MockServerFixture::new().await;
    let mock = fx
        .server
        .mock("GET", "/reverse")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("lat".into(), "52.516300".into()),
            Matcher::UrlEncoded("lon".into(), "13.377700".into()),
        ]))
        .with_status(200)
        .with_body(BERLIN_REVERSE)
        .expect(1)
        .create_async()
        .await;

    let loc = fx
        .geocoder(0.0)
        .reverse_geocode(Point::new(52.5163, 13.3777))
        .await
        .unwrap();
    assert_eq!(loc.country, "Deutschland");
    assert_eq!(loc.city, "Berlin");
    assert_eq!(loc.address, "Unter den Linden 77");
    assert_eq!(loc.lat, 52.5163);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_reverse_geocode_error_body_is_not_found() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_get_json("/reverse", 200, r#"{"error":"Unable to geocode"}"#)
        .await;
    let err = fx
        .geocoder(0.0)
        .reverse_geocode(Point::new(0.0, -140.0))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_invalid_point_is_rejected_before_any_request() {
    let mut fx = MockServerFixture::new().await;
    let mock = fx
        .server
        .mock("GET", "/reverse")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let err = fx
        .geocoder(0.0)
        .reverse_geocode(Point::new(123.0, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, geo_batch::Error::Validation { .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_status_error() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx.mock_get_json("/search", 503, r#"{"error":"down"}"#).await;
    let err = fx.geocoder(0.0).geocode("Berlin").await.unwrap_err();
    assert_eq!(err.provider_kind(), Some(ProviderErrorKind::Status(503)));
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx.mock_get_json("/search", 200, "<html>oops</html>").await;
    let err = fx.geocoder(0.0).geocode("Berlin").await.unwrap_err();
    assert_eq!(err.provider_kind(), Some(ProviderErrorKind::Parse));
}

#[tokio::test]
async fn test_429_pauses_the_limiter() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("retry-after", "3")
        .create_async()
        .await;

    let geocoder = fx.geocoder(0.0);
    let err = geocoder.geocode("Berlin").await.unwrap_err();
    assert_eq!(
        err.provider_kind(),
        Some(ProviderErrorKind::RateLimited {
            retry_after_secs: Some(3)
        })
    );
    let wait = geocoder.rate_limiter().snapshot().estimated_wait_ms.unwrap();
    assert!(wait > 2_000, "wait {}", wait);
}

#[tokio::test]
async fn test_elevation_rounds_and_caches() {
    let mut fx = MockServerFixture::new().await;
    let mock = fx
        .server
        .mock("POST", ELEVATION_PATH)
        .match_body(Matcher::Json(json!({
            "locations": [{"latitude": 46.5, "longitude": 7.25}]
        })))
        .with_status(200)
        .with_body(r#"{"results":[{"latitude":46.5,"longitude":7.25,"elevation":1234.6}]}"#)
        .expect(1)
        .create_async()
        .await;

    let provider = fx.elevation(0.0, Duration::from_secs(1));
    let p = Point::new(46.5, 7.25);
    assert_eq!(provider.elevation(p).await.unwrap(), 1235);
    assert_eq!(provider.elevation(p).await.unwrap(), 1235);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_elevation_empty_results_is_not_found() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx.mock_elevation(r#"{"results":[]}"#).await;
    let err = fx
        .elevation(0.0, Duration::from_secs(1))
        .elevation(Point::new(1.0, 1.0))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_admission_timeout_skips_the_request() {
    let mut fx = MockServerFixture::new().await;
    let mock = fx
        .server
        .mock("POST", ELEVATION_PATH)
        .with_status(200)
        .with_body(r#"{"results":[{"elevation":10.0}]}"#)
        .expect(1)
        .create_async()
        .await;

    // One token per second, 100ms patience: the second distinct point cannot be admitted.
    let provider = fx.elevation(1.0, Duration::from_millis(100));
    provider.elevation(Point::new(1.0, 1.0)).await.unwrap();
    let err = provider.elevation(Point::new(2.0, 2.0)).await.unwrap_err();
    assert!(err.is_admission_timeout());
    assert!(!err.is_provider_failure());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_full_location_composes_providers() {
    let mut fx = MockServerFixture::new().await;
    let _r = fx.mock_get_json("/reverse", 200, BERLIN_REVERSE).await;
    let _e = fx
        .mock_elevation(r#"{"results":[{"elevation":34.2}]}"#)
        .await;

    let geocoder = fx.geocoder(0.0);
    let elevation = fx.elevation(0.0, Duration::from_secs(1));
    let loc = full_location(Point::new(52.5163, 13.3777), &geocoder, &elevation)
        .await
        .unwrap();
    assert_eq!(loc.elevation, 34);
    assert_eq!(loc.timezone, "UTC");
    assert_eq!(loc.city, "Berlin");
}

#[tokio::test]
async fn test_batch_lookups_over_http() {
    let mut fx = MockServerFixture::new().await;
    let _s = fx.mock_get_json("/search", 200, BERLIN_SEARCH).await;
    let _r = fx.mock_get_json("/reverse", 200, BERLIN_REVERSE).await;
    let _e = fx
        .mock_elevation(r#"{"results":[{"elevation":34.0}]}"#)
        .await;

    let exec = BatchExecutor::with_concurrency(4);
    let geocoder: Arc<dyn Geocoder> = Arc::new(fx.geocoder(0.0));
    let elevation: Arc<dyn ElevationProvider> = Arc::new(fx.elevation(0.0, Duration::from_secs(1)));

    let points = batch_geocode(
        &exec,
        geocoder.clone(),
        vec!["Berlin".into(), "Berlin".into(), "Berlin".into()],
    )
    .await
    .unwrap();
    assert_eq!(points.len(), 3);

    let elevations = batch_elevation(&exec, elevation.clone(), points.clone())
        .await
        .unwrap();
    assert_eq!(elevations, vec![34, 34, 34]);

    let locations = batch_full_location(&exec, geocoder, elevation, points)
        .await
        .unwrap();
    assert!(locations.iter().all(|l| l.address == "Unter den Linden 77"));
}

#[tokio::test]
async fn test_failed_batch_releases_waiting_lookups() {
    let mut fx = MockServerFixture::new().await;
    let failing = fx
        .server
        .mock("POST", ELEVATION_PATH)
        .with_status(500)
        .with_body("upstream down")
        .expect(1)
        .create_async()
        .await;

    // One token per second: the first lookup fails at once, the other two are
    // parked in the limiter when the batch gives up.
    let provider = Arc::new(fx.elevation(1.0, Duration::from_secs(5)));
    let exec = BatchExecutor::with_concurrency(3);
    let points = vec![
        Point::new(1.0, 1.0),
        Point::new(2.0, 2.0),
        Point::new(3.0, 3.0),
    ];

    let start = std::time::Instant::now();
    let err = batch_elevation(&exec, provider.clone(), points)
        .await
        .unwrap_err();
    assert!(err.is_provider_failure());
    assert!(start.elapsed() < Duration::from_millis(800));

    let settled = tokio::time::timeout(Duration::from_secs(1), async {
        while provider.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(settled.is_ok(), "cancelled lookups left flights behind");
    assert!(provider.rate_limiter().snapshot().tokens > -0.5);
    failing.assert_async().await;
    failing.remove_async().await;

    let _ok = fx
        .mock_elevation(r#"{"results":[{"elevation":12.0}]}"#)
        .await;
    let start = std::time::Instant::now();
    let elevation = provider.elevation(Point::new(2.0, 2.0)).await.unwrap();
    assert_eq!(elevation, 12);
    assert!(start.elapsed() < Duration::from_millis(1500));
}
