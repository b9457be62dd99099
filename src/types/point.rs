use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Latitude, -90 to 90.
    pub lat: f64,
    /// Longitude, -180 to 180.
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Reject coordinates outside the WGS84 ranges (or NaN).
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::validation_with_context(
                format!("latitude {} out of range", self.lat),
                ErrorContext::new()
                    .with_field_path("point.lat")
                    .with_details("expected -90..=90"),
            ));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(Error::validation_with_context(
                format!("longitude {} out of range", self.lon),
                ErrorContext::new()
                    .with_field_path("point.lon")
                    .with_details("expected -180..=180"),
            ));
        }
        Ok(())
    }
}

impl From<(f64, f64)> for Point {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}
