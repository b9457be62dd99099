//! Distance matrix and polygon filter over a handful of European capitals.
//!
//! Run with `RUST_LOG=geo_batch=debug cargo run --example distance_matrix`.

use geo_batch::geometry::{distance_matrix, filter_points_in_polygon, haversine_km};
use geo_batch::{BatchConfig, BatchExecutor, Point};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let names = ["Berlin", "Paris", "Lisbon", "Rome", "Warsaw"];
    let points = vec![
        Point::new(52.5200, 13.4050),
        Point::new(48.8566, 2.3522),
        Point::new(38.7223, -9.1393),
        Point::new(41.9028, 12.4964),
        Point::new(52.2297, 21.0122),
    ];

    let exec = BatchExecutor::with_config(BatchConfig::from_env()?);
    let matrix = distance_matrix(&exec, points.clone(), haversine_km).await?;

    print!("{:>8}", "");
    for name in names {
        print!("{:>9}", name);
    }
    println!();
    for (name, row) in names.iter().zip(&matrix) {
        print!("{:>8}", name);
        for d in row {
            print!("{:>9.0}", d);
        }
        println!();
    }

    // Rough box around central Europe.
    let central = vec![
        Point::new(45.0, 5.0),
        Point::new(55.0, 5.0),
        Point::new(55.0, 25.0),
        Point::new(45.0, 25.0),
    ];
    let inside = filter_points_in_polygon(&exec, points, central).await?;
    println!("\n{} of {} cities inside the central box", inside.len(), names.len());
    Ok(())
}
