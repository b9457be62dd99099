//! Geocode a few addresses, then look up the full location of each result.
//!
//! Talks to the public Nominatim and Open-Elevation services; set
//! `GEO_BATCH_USER_AGENT` to identify your application.

use geo_batch::providers::{batch_full_location, batch_geocode, ElevationProvider, Geocoder};
use geo_batch::GeoBatchConfig;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => GeoBatchConfig::from_file(path)?.apply_env()?,
        None => GeoBatchConfig::from_env()?,
    };
    let exec = config.executor();
    let geocoder: Arc<dyn Geocoder> = Arc::new(config.build_geocoder()?);
    let elevation: Arc<dyn ElevationProvider> = Arc::new(config.build_elevation()?);

    let addresses = vec![
        "Brandenburger Tor, Berlin".to_string(),
        "Praça do Comércio, Lisboa".to_string(),
        "Piazza Navona, Roma".to_string(),
    ];
    let points = batch_geocode(&exec, geocoder.clone(), addresses.clone()).await?;
    for (addr, p) in addresses.iter().zip(&points) {
        println!("{:<30} {}", addr, p);
    }

    let locations = batch_full_location(&exec, geocoder, elevation, points).await?;
    for loc in &locations {
        println!(
            "{}, {} ({}) {} m, tz {}",
            loc.address, loc.city, loc.country, loc.elevation, loc.timezone
        );
    }
    Ok(())
}
