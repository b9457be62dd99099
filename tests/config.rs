use geo_batch::config::GeoBatchConfig;
use geo_batch::Error;
use std::io::Write;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const FULL_YAML: &str = r#"
concurrency: 8
cache:
  sweep_interval_secs: 600
geocoder:
  user_agent: "my-app/1.0"
  base_url: "https://nominatim.example.org"
  requests_per_sec: 1
  timeout_secs: 10
  cache_ttl_secs: 86400
elevation:
  base_url: "https://elevation.example.org/api/v1/lookup"
  requests_per_sec: 5
  timeout_secs: 10
  admission_timeout_secs: 5
  cache_ttl_secs: 2592000
"#;

#[test]
fn test_full_yaml() {
    let cfg = assert_ok!(GeoBatchConfig::from_yaml_str(FULL_YAML));
    assert_eq!(cfg.concurrency, Some(8));
    assert_eq!(cfg.executor().config().concurrency, 8);

    let g = cfg.geocoder_config();
    assert_eq!(g.user_agent, "my-app/1.0");
    assert_eq!(g.base_url, "https://nominatim.example.org");
    assert_eq!(g.cache_ttl, Duration::from_secs(86_400));
    assert_eq!(g.sweep_interval, Duration::from_secs(600));

    let e = cfg.elevation_config();
    assert_eq!(e.requests_per_sec, 5.0);
    assert_eq!(e.admission_timeout, Duration::from_secs(5));
    assert_eq!(e.cache_ttl, Duration::from_secs(2_592_000));
}

#[test]
fn test_from_file() {
    let path = std::env::temp_dir().join(format!("geo-batch-config-{}.yaml", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(FULL_YAML.as_bytes()).unwrap();
    drop(file);

    let cfg = GeoBatchConfig::from_file(&path).unwrap();
    assert_eq!(cfg.cache.sweep_interval_secs, 600);
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(
        GeoBatchConfig::from_file("/definitely/not/here.yaml"),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_invalid_file_names_the_file() {
    let path = std::env::temp_dir().join(format!("geo-batch-bad-{}.yaml", std::process::id()));
    std::fs::write(&path, "concurrency: 0\n").unwrap();
    let err = GeoBatchConfig::from_file(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    let details = err.context().and_then(|c| c.details.clone()).unwrap_or_default();
    assert!(details.contains("geo-batch-bad-"), "details: {}", details);
}

#[tokio::test]
async fn test_builds_providers() {
    let cfg = GeoBatchConfig::from_yaml_str(FULL_YAML).unwrap();
    let geocoder = assert_ok!(cfg.build_geocoder());
    assert_eq!(geocoder.rate_limiter().config().rps, 1.0);
    let elevation = assert_ok!(cfg.build_elevation());
    assert_eq!(elevation.rate_limiter().config().rps, 5.0);
}

#[test]
fn test_env_only_configuration() {
    let cfg = assert_ok!(GeoBatchConfig::default().apply_env_from(|k| match k {
        "GEO_BATCH_CONCURRENCY" => Some("2".into()),
        "GEO_BATCH_ELEVATION_RPS" => Some("0".into()),
        _ => None,
    }));
    assert_eq!(cfg.batch_config().concurrency, 2);
    assert_eq!(cfg.elevation_config().requests_per_sec, 0.0);

    assert_err!(GeoBatchConfig::default()
        .apply_env_from(|k| (k == "GEO_BATCH_USER_AGENT").then(|| " ".to_string())));
    assert_err!(GeoBatchConfig::default()
        .apply_env_from(|k| (k == "GEO_BATCH_CACHE_SWEEP_SECS").then(|| "hourly".to_string())));
}
