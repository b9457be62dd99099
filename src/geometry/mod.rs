//! 几何模块：球面距离、点在多边形内判定，以及基于批处理执行器的距离矩阵与多边形过滤。
//!
//! # Geometry Module
//!
//! Pure work functions plus their batch entry points.
//!
//! | Function | Batch entry point |
//! |----------|-------------------|
//! | [`haversine_km`] | [`distance_matrix`] (pairwise) |
//! | [`point_in_polygon`] | [`filter_points_in_polygon`] (linear) |
//!
//! Distances assume a spherical earth of radius [`EARTH_RADIUS_KM`].

mod distance;
mod polygon;

pub use distance::{distance_matrix, haversine_km, EARTH_RADIUS_KM};
pub use polygon::{filter_points_in_polygon, point_in_polygon};
