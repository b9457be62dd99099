use super::Point;
use serde::{Deserialize, Serialize};

/// Timezone reported for every location; resolution is not performed.
pub const TIMEZONE_STUB: &str = "UTC";

/// Comprehensive information about a point.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub city: String,
    /// Street and house number, space separated.
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    /// Meters above sea level.
    pub elevation: i32,
    /// IANA timezone identifier (always [`TIMEZONE_STUB`]).
    pub timezone: String,
}

impl Location {
    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}
