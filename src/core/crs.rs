//! Coordinate reference systems binding a projection, a transformation and
//! the zoom-to-scale rule into one geographic <-> pixel mapping.

use crate::core::constants::{EARTH_RADIUS, TILE_SIZE};
use crate::core::geo::{LatLng, Point};
use crate::core::projection::{LonLat, Projection, SphericalMercator};
use crate::core::transformation::Transformation;
use crate::{MapError, Result};
use std::f64::consts::PI;

#[derive(Debug)]
pub struct Crs {
    pub code: &'static str,
    projection: &'static dyn Projection,
    transformation: Transformation,
    /// Multiplier from projected units to the CRS's native units (meters for EPSG:3857)
    units_per_projected: f64,
    /// World size in pixels at zoom 0
    tile_size: f64,
}

/// Spherical Mercator, the standard web map CRS
pub static EPSG3857: Crs = Crs {
    code: "EPSG:3857",
    projection: &SphericalMercator,
    transformation: Transformation::new(0.5 / PI, 0.5, -0.5 / PI, 0.5),
    units_per_projected: EARTH_RADIUS,
    tile_size: TILE_SIZE as f64,
};

/// Legacy alias of EPSG:3857
pub static EPSG900913: Crs = Crs {
    code: "EPSG:900913",
    projection: &SphericalMercator,
    transformation: Transformation::new(0.5 / PI, 0.5, -0.5 / PI, 0.5),
    units_per_projected: EARTH_RADIUS,
    tile_size: TILE_SIZE as f64,
};

/// Plain longitude/latitude (equirectangular)
pub static EPSG4326: Crs = Crs {
    code: "EPSG:4326",
    projection: &LonLat,
    transformation: Transformation::new(1.0 / 360.0, 0.5, -1.0 / 360.0, 0.5),
    units_per_projected: 1.0,
    tile_size: TILE_SIZE as f64,
};

impl Crs {
    /// Looks up one of the built-in CRS definitions by its code
    pub fn from_code(code: &str) -> Result<&'static Crs> {
        [&EPSG3857, &EPSG900913, &EPSG4326]
            .into_iter()
            .find(|crs| crs.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| MapError::UnknownCrs(code.to_string()))
    }

    pub fn projection(&self) -> &'static dyn Projection {
        self.projection
    }

    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    /// Pixel scale at a zoom level: resolution doubles per zoom step
    pub fn scale(&self, zoom: f64) -> f64 {
        self.tile_size * 2_f64.powf(zoom)
    }

    pub fn lat_lng_to_point(&self, lat_lng: &LatLng, scale: f64) -> Point {
        let mut projected = self.projection.project(lat_lng);
        self.transformation.transform_mut(&mut projected, scale);
        projected
    }

    pub fn point_to_lat_lng(&self, point: &Point, scale: f64, unbounded: bool) -> LatLng {
        let untransformed = self.transformation.untransform(point, scale);
        self.projection.unproject(&untransformed, unbounded)
    }

    /// Projects into the CRS's native units (meters for EPSG:3857)
    pub fn project(&self, lat_lng: &LatLng) -> Point {
        self.projection
            .project(lat_lng)
            .multiply(self.units_per_projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_doubles_per_zoom() {
        assert_eq!(EPSG3857.scale(0.0), 256.0);
        assert_eq!(EPSG3857.scale(1.0), 512.0);
        assert_eq!(EPSG3857.scale(3.0), 2048.0);
    }

    #[test]
    fn test_origin_maps_to_world_center() {
        let point = EPSG3857.lat_lng_to_point(&LatLng::new(0.0, 0.0).unwrap(), 256.0);
        assert!((point.x - 128.0).abs() < 1e-9);
        assert!((point.y - 128.0).abs() < 1e-9);

        let nw = EPSG3857.lat_lng_to_point(&LatLng::new(85.0511287798, -180.0).unwrap(), 256.0);
        assert!(nw.x.abs() < 1e-9);
        assert!(nw.y.abs() < 1e-6);
    }

    #[test]
    fn test_round_trip_at_fixed_zoom() {
        for crs in [&EPSG3857, &EPSG4326] {
            let scale = crs.scale(7.0);
            for (lat, lng) in [(0.0, 0.0), (51.5, -0.12), (-33.9, 151.2), (80.0, 179.0)] {
                let original = LatLng::new(lat, lng).unwrap();
                let point = crs.lat_lng_to_point(&original, scale);
                let back = crs.point_to_lat_lng(&point, scale, false);
                assert!((back.lat - lat).abs() < 1e-9, "{} lat {lat}", crs.code);
                assert!((back.lng - lng).abs() < 1e-9, "{} lng {lng}", crs.code);
            }
        }
    }

    #[test]
    fn test_project_in_meters() {
        let meters = EPSG3857.project(&LatLng::new(0.0, 180.0).unwrap());
        assert!((meters.x - PI * EARTH_RADIUS).abs() < 1e-6);

        let degrees = EPSG4326.project(&LatLng::new(10.0, 20.0).unwrap());
        assert_eq!(degrees, Point::new(20.0, 10.0));
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Crs::from_code("EPSG:3857").unwrap().code, "EPSG:3857");
        assert_eq!(Crs::from_code("epsg:4326").unwrap().code, "EPSG:4326");
        assert!(matches!(
            Crs::from_code("EPSG:27700"),
            Err(MapError::UnknownCrs(_))
        ));
    }
}
