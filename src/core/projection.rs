//! Geographical projections used by the CRS definitions.
//!
//! A projection maps a [`LatLng`] onto an unscaled plane. Scaling into pixel
//! space is the job of [`crate::core::transformation::Transformation`].

use crate::core::constants::MAX_LATITUDE;
use crate::core::geo::{LatLng, Point};
use std::f64::consts::FRAC_PI_2;
use std::f64::consts::FRAC_PI_4;

/// Pure mapping between geographic coordinates and a projected plane
pub trait Projection: Send + Sync + std::fmt::Debug {
    fn project(&self, lat_lng: &LatLng) -> Point;

    /// Inverse of [`Projection::project`]. With `unbounded` set the result is
    /// neither clamped nor wrapped, which animation math relies on.
    fn unproject(&self, point: &Point, unbounded: bool) -> LatLng;
}

/// Spherical Mercator in radians, the projection behind EPSG:3857
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalMercator;

impl SphericalMercator {
    pub const MAX_LATITUDE: f64 = MAX_LATITUDE;
}

impl Projection for SphericalMercator {
    fn project(&self, lat_lng: &LatLng) -> Point {
        let lat = lat_lng.lat.clamp(-Self::MAX_LATITUDE, Self::MAX_LATITUDE);
        let x = lat_lng.lng.to_radians();
        let y = (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();

        Point::new(x, y)
    }

    fn unproject(&self, point: &Point, unbounded: bool) -> LatLng {
        let lng = point.x.to_degrees();
        let lat = (2.0 * point.y.exp().atan() - FRAC_PI_2).to_degrees();

        LatLng::from_raw(lat, lng, unbounded)
    }
}

/// Plain longitude/latitude, the projection behind EPSG:4326
#[derive(Debug, Clone, Copy, Default)]
pub struct LonLat;

impl Projection for LonLat {
    fn project(&self, lat_lng: &LatLng) -> Point {
        Point::new(lat_lng.lng, lat_lng.lat)
    }

    fn unproject(&self, point: &Point, unbounded: bool) -> LatLng {
        LatLng::from_raw(point.y, point.x, unbounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_lat_lng_close(a: &LatLng, b: &LatLng) {
        assert!(
            (a.lat - b.lat).abs() < 1e-9 && (a.lng - b.lng).abs() < 1e-9,
            "{a} != {b}"
        );
    }

    #[test]
    fn test_mercator_round_trip() {
        let projection = SphericalMercator;
        for lat in [-85.0, -45.5, -1.0, 0.0, 12.345, 60.0, 85.0] {
            for lng in [-179.9, -90.0, 0.0, 45.25, 179.9] {
                let original = LatLng::new(lat, lng).unwrap();
                let back = projection.unproject(&projection.project(&original), false);
                assert_lat_lng_close(&original, &back);
            }
        }
    }

    #[test]
    fn test_mercator_origin_and_limit() {
        let projection = SphericalMercator;
        let origin = projection.project(&LatLng::new(0.0, 0.0).unwrap());
        assert!(origin.x.abs() < 1e-12 && origin.y.abs() < 1e-12);

        // the latitude limit maps to y = PI, the square-world edge
        let edge = projection.project(&LatLng::new(MAX_LATITUDE, 180.0).unwrap());
        assert!((edge.y - std::f64::consts::PI).abs() < 1e-6);
        assert!((edge.x - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_mercator_clamps_polar_latitudes() {
        let projection = SphericalMercator;
        let pole = projection.project(&LatLng::new(90.0, 0.0).unwrap());
        let limit = projection.project(&LatLng::new(MAX_LATITUDE, 0.0).unwrap());
        assert_eq!(pole, limit);
        assert!(pole.y.is_finite());
    }

    #[test]
    fn test_unbounded_unproject_keeps_raw_longitude() {
        let projection = SphericalMercator;
        let point = Point::new(190.0_f64.to_radians(), 0.0);

        let bounded = projection.unproject(&point, false);
        let unbounded = projection.unproject(&point, true);
        assert!((bounded.lng + 170.0).abs() < 1e-9);
        assert!((unbounded.lng - 190.0).abs() < 1e-9);
    }

    #[test]
    fn test_lon_lat_identity() {
        let projection = LonLat;
        let coord = LatLng::new(-33.5, 151.25).unwrap();
        let projected = projection.project(&coord);
        assert_eq!(projected, Point::new(151.25, -33.5));
        assert_eq!(projection.unproject(&projected, false), coord);
    }
}
