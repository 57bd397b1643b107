//! Geographic position type and great-circle distance.
//!
//! Distances use the haversine formula on a spherical earth model, which
//! is accurate to well under 1% at proximity-alert ranges. All angles are
//! degrees, all distances meters.

use std::f64::consts::PI;

/// Earth's mean radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = PI / 180.0;

/// A geographic position.
///
/// - Latitude: degrees north (-90 to 90)
/// - Longitude: degrees east (-180 to 180)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Position {
    /// Create a position from latitude and longitude in degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Calculate the great-circle distance between two positions, in meters.
///
/// Uses the haversine formula. Total over its domain: identical points
/// yield exactly 0.0 and antipodal points yield half the earth's
/// circumference without error.
///
/// # Example
///
/// ```
/// use buddywatch::geo::{distance_meters, Position};
///
/// // One degree of latitude is roughly 111 km
/// let d = distance_meters(Position::new(0.0, 0.0), Position::new(1.0, 0.0));
/// assert!((d - 111_195.0).abs() < 100.0);
/// ```
pub fn distance_meters(from: Position, to: Position) -> f64 {
    let lat1_rad = from.latitude * DEG_TO_RAD;
    let lat2_rad = to.latitude * DEG_TO_RAD;
    let delta_lat = (to.latitude - from.latitude) * DEG_TO_RAD;
    let delta_lon = (to.longitude - from.longitude) * DEG_TO_RAD;

    // Haversine formula
    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Clamp guards against rounding pushing sqrt's argument past 1.0
    // for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_points_are_zero() {
        let p = Position::new(53.5, 10.0);
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Position::new(59.91, 10.75); // Oslo
        let b = Position::new(55.68, 12.57); // Copenhagen
        assert_eq!(distance_meters(a, b), distance_meters(b, a));
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = distance_meters(Position::new(0.0, 0.0), Position::new(1.0, 0.0));
        // 1 degree of arc = earth circumference / 360 ≈ 111.195 km
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn test_antipodal_points() {
        let d = distance_meters(Position::new(0.0, 0.0), Position::new(0.0, 180.0));
        let half_circumference = PI * EARTH_RADIUS_M;
        assert!((d - half_circumference).abs() < 1.0, "got {}", d);
        assert!(d.is_finite());
    }

    #[test]
    fn test_short_range_accuracy() {
        // ~1000m due north of a mid-latitude point
        let from = Position::new(53.0, 10.0);
        let to = Position::new(53.0 + 1000.0 / 111_195.0, 10.0);
        let d = distance_meters(from, to);
        assert!((d - 1000.0).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_distance_is_non_negative() {
        let a = Position::new(-33.86, 151.21); // Sydney
        let b = Position::new(40.71, -74.01); // New York
        assert!(distance_meters(a, b) > 0.0);
        assert!(distance_meters(b, a) > 0.0);
    }
}
