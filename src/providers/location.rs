use super::{ElevationProvider, Geocoder};
use crate::types::{Location, Point, TIMEZONE_STUB};
use crate::Result;

/// Reverse-geocoded address plus elevation for `point`.
///
/// The timezone is always [`TIMEZONE_STUB`].
pub async fn full_location(
    point: Point,
    geocoder: &dyn Geocoder,
    elevation: &dyn ElevationProvider,
) -> Result<Location> {
    let mut loc = geocoder.reverse_geocode(point).await?;
    loc.elevation = elevation.elevation(point).await?;
    loc.timezone = TIMEZONE_STUB.to_string();
    Ok(loc)
}
