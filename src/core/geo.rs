use crate::core::constants::{EARTH_RADIUS, LAT_LNG_MAX_MARGIN};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rounds to five decimals for display, like Leaflet's `formatNum`
fn format_num(num: f64) -> f64 {
    (num * 1e5).round() / 1e5
}

/// Represents a geographical coordinate with latitude and longitude.
///
/// Values built through [`LatLng::new`] have their latitude clamped to
/// `[-90, 90]` and their longitude wrapped into `[-180, 180)`; exactly `180`
/// is kept so that whole-world bounds stay well ordered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new clamped and wrapped coordinate
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        Self::validate(lat, lng)?;
        Ok(Self::from_raw(lat, lng, false))
    }

    /// Creates a coordinate without clamping or wrapping.
    /// Used for bounds corners, where wrapped values would corrupt min/max tracking.
    pub fn new_unwrapped(lat: f64, lng: f64) -> Result<Self> {
        Self::validate(lat, lng)?;
        Ok(Self::from_raw(lat, lng, true))
    }

    /// Builds a coordinate from already-numeric math results without validation
    pub(crate) fn from_raw(lat: f64, lng: f64, no_wrap: bool) -> Self {
        if no_wrap {
            Self { lat, lng }
        } else {
            Self {
                lat: Self::clamp_lat(lat),
                lng: Self::wrap_lng(lng),
            }
        }
    }

    fn validate(lat: f64, lng: f64) -> Result<()> {
        if lat.is_finite() && lng.is_finite() {
            Ok(())
        } else {
            Err(MapError::InvalidCoordinates(format!(
                "Invalid LatLng object: ({lat}, {lng})"
            )))
        }
    }

    /// Clamps latitude into [-90, 90]
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-90.0, 90.0)
    }

    /// Wraps longitude into [-180, 180), leaving exactly 180 untouched
    pub fn wrap_lng(lng: f64) -> f64 {
        if lng == 180.0 {
            return lng;
        }
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }

    /// Equality within `LAT_LNG_MAX_MARGIN`, tolerating round-trip error
    pub fn equals(&self, other: &LatLng) -> bool {
        let margin = (self.lat - other.lat)
            .abs()
            .max((self.lng - other.lng).abs());
        margin <= LAT_LNG_MAX_MARGIN
    }

    /// Calculates the distance in meters to another LatLng using the Haversine formula
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let sin1 = ((other.lat - self.lat).to_radians() / 2.0).sin();
        let sin2 = ((other.lng - self.lng).to_radians() / 2.0).sin();

        let a = sin1 * sin1 + sin2 * sin2 * lat1_rad.cos() * lat2_rad.cos();

        EARTH_RADIUS * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LatLng({}, {})", format_num(self.lat), format_num(self.lng))
    }
}

impl TryFrom<(f64, f64)> for LatLng {
    type Error = MapError;

    fn try_from((lat, lng): (f64, f64)) -> Result<Self> {
        LatLng::new(lat, lng)
    }
}

/// Represents a point in screen or projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Creates a point with both components rounded to integers
    pub fn new_rounded(x: f64, y: f64) -> Self {
        Self::new(x.round(), y.round())
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    /// In-place add for hot paths
    pub fn add_mut(&mut self, other: &Point) -> &mut Self {
        self.x += other.x;
        self.y += other.y;
        self
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    /// In-place subtract for hot paths
    pub fn subtract_mut(&mut self, other: &Point) -> &mut Self {
        self.x -= other.x;
        self.y -= other.y;
        self
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    /// Component-wise multiplication, e.g. grid coordinate times tile size
    pub fn scale_by(&self, other: &Point) -> Point {
        Point::new(self.x * other.x, self.y * other.y)
    }

    pub fn divide_by(&self, num: f64) -> Point {
        Point::new(self.x / num, self.y / num)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn round(&self) -> Point {
        Point::new(self.x.round(), self.y.round())
    }

    /// In-place round
    pub fn round_mut(&mut self) -> &mut Self {
        self.x = self.x.round();
        self.y = self.y.round();
        self
    }

    pub fn floor(&self) -> Point {
        Point::new(self.x.floor(), self.y.floor())
    }

    pub fn ceil(&self) -> Point {
        Point::new(self.x.ceil(), self.y.ceil())
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({}, {})", format_num(self.x), format_num(self.y))
    }
}

/// Represents a bounding box of geographical coordinates.
///
/// Corners are stored unwrapped and kept ordered (`south_west <= north_east`
/// component-wise) by [`LatLngBounds::extend`]. A bounds with no points is
/// represented as `None` by [`LatLngBounds::from_points`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "BoundsCorners")]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

/// Wire form of [`LatLngBounds`]; corners may arrive in any order
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundsCorners {
    south_west: LatLng,
    north_east: LatLng,
}

impl From<BoundsCorners> for LatLngBounds {
    fn from(corners: BoundsCorners) -> Self {
        LatLngBounds::new(corners.south_west, corners.north_east)
    }
}

impl LatLngBounds {
    /// Creates bounds covering both corners, in any order
    pub fn new(a: LatLng, b: LatLng) -> Self {
        let mut bounds = Self::from_point(a);
        bounds.extend(&b);
        bounds
    }

    fn from_point(point: LatLng) -> Self {
        let corner = LatLng::from_raw(point.lat, point.lng, true);
        Self {
            south_west: corner,
            north_east: corner,
        }
    }

    /// Creates the minimal bounds containing every point; `None` when empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LatLng>,
    {
        let mut iter = points.into_iter();
        let mut bounds = Self::from_point(*iter.next()?);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Result<Self> {
        Ok(Self::new(
            LatLng::new_unwrapped(south, west)?,
            LatLng::new_unwrapped(north, east)?,
        ))
    }

    /// Extends the bounds to include a point
    pub fn extend(&mut self, point: &LatLng) -> &mut Self {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
        self
    }

    /// Extends the bounds to include another bounds
    pub fn extend_bounds(&mut self, other: &LatLngBounds) -> &mut Self {
        self.extend(&other.south_west);
        self.extend(&other.north_east)
    }

    /// Returns bounds grown on every side by `buffer_ratio` of the span
    pub fn pad(&self, buffer_ratio: f64) -> LatLngBounds {
        let height_buffer = (self.south_west.lat - self.north_east.lat).abs() * buffer_ratio;
        let width_buffer = (self.south_west.lng - self.north_east.lng).abs() * buffer_ratio;

        LatLngBounds::new(
            LatLng::from_raw(
                self.south_west.lat - height_buffer,
                self.south_west.lng - width_buffer,
                true,
            ),
            LatLng::from_raw(
                self.north_east.lat + height_buffer,
                self.north_east.lng + width_buffer,
                true,
            ),
        )
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::from_raw(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
            false,
        )
    }

    pub fn north_west(&self) -> LatLng {
        LatLng::from_raw(self.north_east.lat, self.south_west.lng, true)
    }

    pub fn south_east(&self) -> LatLng {
        LatLng::from_raw(self.south_west.lat, self.north_east.lng, true)
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    /// Checks if the bounds fully contain another bounds
    pub fn contains_bounds(&self, other: &LatLngBounds) -> bool {
        self.contains(&other.south_west) && self.contains(&other.north_east)
    }

    /// Checks if the bounds intersect with another bounds
    pub fn intersects(&self, other: &LatLngBounds) -> bool {
        let lat_intersects = other.north_east.lat >= self.south_west.lat
            && other.south_west.lat <= self.north_east.lat;
        let lng_intersects = other.north_east.lng >= self.south_west.lng
            && other.south_west.lng <= self.north_east.lng;

        lat_intersects && lng_intersects
    }

    /// `west,south,east,north`, the order WMS-style services expect
    pub fn to_bbox_string(&self) -> String {
        format!(
            "{},{},{},{}",
            self.south_west.lng, self.south_west.lat, self.north_east.lng, self.north_east.lat
        )
    }

    /// Corner-wise equality within the `LatLng::equals` margin
    pub fn equals(&self, other: &LatLngBounds) -> bool {
        self.south_west.equals(&other.south_west) && self.north_east.equals(&other.north_east)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lng_creation() {
        let coord = LatLng::new(40.7128, -74.0060).unwrap();
        assert_eq!(coord.lat, 40.7128);
        assert_eq!(coord.lng, -74.0060);
    }

    #[test]
    fn test_lat_lng_rejects_nan() {
        assert!(matches!(
            LatLng::new(f64::NAN, 10.0),
            Err(MapError::InvalidCoordinates(_))
        ));
        assert!(LatLng::new(10.0, f64::INFINITY).is_err());
        assert!(LatLng::new_unwrapped(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_lat_lng_clamp_and_wrap() {
        let coord = LatLng::new(95.0, 190.0).unwrap();
        assert_eq!(coord.lat, 90.0);
        assert_eq!(coord.lng, -170.0);

        assert_eq!(LatLng::new(0.0, -190.0).unwrap().lng, 170.0);
        assert_eq!(LatLng::new(0.0, -180.0).unwrap().lng, -180.0);
        assert_eq!(LatLng::new(0.0, 180.0).unwrap().lng, 180.0);
        assert_eq!(LatLng::new(0.0, 540.0).unwrap().lng, -180.0);
        assert_eq!(LatLng::new(-100.0, 0.0).unwrap().lat, -90.0);

        let raw = LatLng::new_unwrapped(95.0, 190.0).unwrap();
        assert_eq!((raw.lat, raw.lng), (95.0, 190.0));
    }

    #[test]
    fn test_lat_lng_equals_margin() {
        let a = LatLng::new(10.0, 20.0).unwrap();
        assert!(a.equals(&a));
        assert!(a.equals(&LatLng::new(10.0 + 0.5e-9, 20.0).unwrap()));
        assert!(!a.equals(&LatLng::new(10.0, 20.0 + 2e-9).unwrap()));
    }

    #[test]
    fn test_lat_lng_distance() {
        let nyc = LatLng::new(40.7128, -74.0060).unwrap();
        let la = LatLng::new(34.0522, -118.2437).unwrap();
        let distance = nyc.distance_to(&la);

        // Distance should be approximately 3944 km
        assert!((distance - 3944000.0).abs() < 10000.0);
        assert_eq!(nyc.distance_to(&nyc), 0.0);
    }

    #[test]
    fn test_display() {
        let coord = LatLng::new(1.123456789, 2.0).unwrap();
        assert_eq!(coord.to_string(), "LatLng(1.12346, 2)");
        assert_eq!(Point::new(0.5, 3.0).to_string(), "Point(0.5, 3)");
    }

    #[test]
    fn test_point_math() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, 5.0);
        assert_eq!(a.add(&b), Point::new(4.0, 7.0));
        assert_eq!(b.subtract(&a), Point::new(2.0, 3.0));
        assert_eq!(a.multiply(2.0), Point::new(2.0, 4.0));
        assert_eq!(a.scale_by(&b), Point::new(3.0, 10.0));
        assert_eq!(a.distance_to(&Point::new(4.0, 6.0)), 5.0);
        assert_eq!(Point::new_rounded(1.4, 1.6), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_point_in_place_ops_leave_copies_alone() {
        let original = Point::new(1.5, 2.5);
        let mut working = original;
        working.add_mut(&Point::new(1.0, 1.0)).round_mut();

        assert_eq!(working, Point::new(3.0, 4.0));
        assert_eq!(original, Point::new(1.5, 2.5));
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = LatLngBounds::from_coords(40.0, -75.0, 41.0, -73.0).unwrap();
        let point_inside = LatLng::new(40.5, -74.0).unwrap();
        let point_outside = LatLng::new(42.0, -74.0).unwrap();

        assert!(bounds.contains(&point_inside));
        assert!(!bounds.contains(&point_outside));
    }

    #[test]
    fn test_bounds_extend_is_minimal() {
        let points = [
            LatLng::new(10.0, 20.0).unwrap(),
            LatLng::new(-5.0, 30.0).unwrap(),
            LatLng::new(3.0, -40.0).unwrap(),
            LatLng::new(12.0, 0.0).unwrap(),
        ];
        let bounds = LatLngBounds::from_points(&points).unwrap();

        for point in &points {
            assert!(bounds.contains(point));
        }
        // every edge is touched by some point
        assert_eq!(bounds.south_west.lat, -5.0);
        assert_eq!(bounds.south_west.lng, -40.0);
        assert_eq!(bounds.north_east.lat, 12.0);
        assert_eq!(bounds.north_east.lng, 30.0);

        assert!(LatLngBounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_bounds_new_orders_corners() {
        let bounds = LatLngBounds::new(
            LatLng::new(10.0, 10.0).unwrap(),
            LatLng::new(-10.0, -10.0).unwrap(),
        );
        assert_eq!(bounds.south_west, LatLng::new(-10.0, -10.0).unwrap());
        assert_eq!(bounds.north_east, LatLng::new(10.0, 10.0).unwrap());
    }

    #[test]
    fn test_bounds_from_json_orders_corners() {
        let bounds: LatLngBounds = serde_json::from_str(
            r#"{
                "southWest": {"lat": 10.0, "lng": 20.0},
                "northEast": {"lat": -10.0, "lng": -20.0}
            }"#,
        )
        .unwrap();
        assert_eq!(bounds.south_west, LatLng::new(-10.0, -20.0).unwrap());
        assert_eq!(bounds.north_east, LatLng::new(10.0, 20.0).unwrap());
        assert!(bounds.contains(&LatLng::new(0.0, 0.0).unwrap()));
    }

    #[test]
    fn test_bounds_pad_and_corners() {
        let bounds = LatLngBounds::from_coords(0.0, 170.0, 10.0, 180.0).unwrap();
        let padded = bounds.pad(0.5);

        assert_eq!(padded.south_west.lat, -5.0);
        assert_eq!(padded.north_east.lng, 185.0);
        assert!(padded.south_west.lng <= padded.north_east.lng);
        assert!(padded.contains_bounds(&bounds));

        assert_eq!(bounds.north_west(), LatLng::new_unwrapped(10.0, 170.0).unwrap());
        assert_eq!(bounds.south_east(), LatLng::new_unwrapped(0.0, 180.0).unwrap());
        assert_eq!(bounds.to_bbox_string(), "170,0,180,10");
    }

    #[test]
    fn test_bounds_intersects() {
        let a = LatLngBounds::from_coords(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = LatLngBounds::from_coords(5.0, 5.0, 15.0, 15.0).unwrap();
        let c = LatLngBounds::from_coords(20.0, 20.0, 30.0, 30.0).unwrap();

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.equals(&a));
        assert!(!a.equals(&b));
    }
}
