//! 地理类型模块：定义坐标点与位置信息等核心数据类型。
//!
//! # Geographic Types
//!
//! Plain data carried through batches: inputs ([`Point`], addresses) and outputs
//! ([`Location`], elevations, distances).
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Point`] | WGS84 coordinate in degrees |
//! | [`Location`] | Reverse-geocoded address plus elevation |

pub mod location;
pub mod point;

pub use location::{Location, TIMEZONE_STUB};
pub use point::Point;
