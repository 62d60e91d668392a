//! Geographic primitives shared across the crate.

use std::f64::consts::PI;
use std::fmt;

/// Earth radius in meters (WGS-84 semi-major axis).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// A geographic coordinate in decimal degrees.
///
/// Immutable value type: derived points are newly constructed, never
/// mutated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point from decimal degrees.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns the point reached by moving `distance_m` meters along
    /// `azimuth_rad` (clockwise from true north).
    ///
    /// Uses a flat-earth approximation, which is accurate at footstep
    /// scale. Longitude displacement is corrected for the local latitude.
    pub fn displaced(&self, distance_m: f64, azimuth_rad: f64) -> GeoPoint {
        let east = distance_m * azimuth_rad.sin();
        let north = distance_m * azimuth_rad.cos();

        let dlat = (north / EARTH_RADIUS_M) * (180.0 / PI);
        let dlon = (east / (EARTH_RADIUS_M * self.latitude.to_radians().cos())) * (180.0 / PI);

        GeoPoint::new(self.latitude + dlat, self.longitude + dlon)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One 0.5 m step converted to degrees of latitude.
    const HALF_METER_LAT_DEG: f64 = (0.5 / EARTH_RADIUS_M) * (180.0 / PI);

    #[test]
    fn test_displaced_north() {
        let origin = GeoPoint::new(48.0, 2.0);
        let moved = origin.displaced(0.5, 0.0);

        assert!((moved.latitude - (48.0 + HALF_METER_LAT_DEG)).abs() < 1e-12);
        assert_eq!(moved.longitude, 2.0);
    }

    #[test]
    fn test_displaced_east() {
        let origin = GeoPoint::new(0.0, 0.0);
        let moved = origin.displaced(0.5, std::f64::consts::FRAC_PI_2);

        // At the equator a pure east step leaves latitude essentially
        // untouched and shifts longitude by the same angular distance.
        assert!(moved.latitude.abs() < 1e-12);
        assert!((moved.longitude - HALF_METER_LAT_DEG).abs() < 1e-12);
    }

    #[test]
    fn test_displaced_is_a_new_value() {
        let origin = GeoPoint::new(53.5, 10.0);
        let moved = origin.displaced(0.5, 1.0);

        assert_eq!(origin, GeoPoint::new(53.5, 10.0));
        assert_ne!(origin, moved);
    }

    #[test]
    fn test_longitude_scaling_grows_with_latitude() {
        let equator = GeoPoint::new(0.0, 0.0).displaced(0.5, std::f64::consts::FRAC_PI_2);
        let north = GeoPoint::new(60.0, 0.0).displaced(0.5, std::f64::consts::FRAC_PI_2);

        // The same eastward distance spans more degrees of longitude at
        // higher latitudes (cos(60°) = 0.5 doubles it).
        assert!((north.longitude / equator.longitude - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_display_format() {
        let point = GeoPoint::new(53.630278, 9.988333);
        assert_eq!(point.to_string(), "53.63028, 9.98833");
    }
}
