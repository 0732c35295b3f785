use crate::core::bounds::Bounds;
use crate::core::constants::{DEFAULT_MIN_ZOOM, ZOOM_CEILING};
use crate::core::crs::Crs;
use crate::core::geo::{LatLng, LatLngBounds, Point};
use crate::{MapError, Result};

/// View lifecycle notifications, fired by the map and consumed by layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    MoveStart,
    Move,
    MoveEnd,
    ZoomStart,
    ZoomEnd,
    /// The pixel origin was recomputed. `hard` resets drop every tile
    /// surface; soft ones keep them around as a background.
    ViewReset { hard: bool },
    /// The first view was set
    Load,
}

/// Current view of the map: zoom, container size and the pixel origin
/// every layer positions itself against.
///
/// Until the first [`Viewport::reset_view`] there is no pixel origin and the
/// pixel-space queries return [`MapError::ViewNotSet`].
#[derive(Debug, Clone)]
pub struct Viewport {
    crs: &'static Crs,
    zoom: i32,
    /// Container size in pixels
    size: Point,
    /// Top-left project pixel at the last view reset
    pixel_origin: Option<Point>,
    /// Accumulated offset of the panes since the last view reset
    pane_position: Point,
    min_zoom: i32,
    max_zoom: i32,
    transition_in_progress: bool,
}

impl Viewport {
    pub fn new(crs: &'static Crs, size: Point) -> Self {
        Self {
            crs,
            zoom: DEFAULT_MIN_ZOOM,
            size,
            pixel_origin: None,
            pane_position: Point::default(),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: ZOOM_CEILING,
            transition_in_progress: false,
        }
    }

    pub fn crs(&self) -> &'static Crs {
        self.crs
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    pub fn size(&self) -> Point {
        self.size
    }

    pub fn min_zoom(&self) -> i32 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> i32 {
        self.max_zoom
    }

    pub fn is_loaded(&self) -> bool {
        self.pixel_origin.is_some()
    }

    pub fn pane_position(&self) -> Point {
        self.pane_position
    }

    pub fn transition_in_progress(&self) -> bool {
        self.transition_in_progress
    }

    pub fn set_transition_in_progress(&mut self, in_progress: bool) {
        self.transition_in_progress = in_progress;
    }

    /// Sets the container size, returning the previous one
    pub fn set_size(&mut self, size: Point) -> Point {
        std::mem::replace(&mut self.size, size)
    }

    /// Sets the effective zoom limits; the current zoom is left untouched
    pub fn set_zoom_limits(&mut self, min_zoom: i32, max_zoom: i32) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom.max(min_zoom);
    }

    /// Clamps a zoom into the effective limits
    pub fn limit_zoom(&self, zoom: i32) -> i32 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Projects a geographic point into absolute pixel space at `zoom`
    /// (current zoom by default)
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<i32>) -> Point {
        let zoom = zoom.unwrap_or(self.zoom);
        self.crs.lat_lng_to_point(lat_lng, self.crs.scale(zoom as f64))
    }

    pub fn unproject(&self, point: &Point, zoom: Option<i32>, unbounded: bool) -> LatLng {
        let zoom = zoom.unwrap_or(self.zoom);
        self.crs
            .point_to_lat_lng(point, self.crs.scale(zoom as f64), unbounded)
    }

    /// Top-left project pixel recorded at the last view reset
    pub fn pixel_origin(&self) -> Result<Point> {
        self.pixel_origin.ok_or(MapError::ViewNotSet)
    }

    /// Current top-left project pixel: the origin minus the pane offset
    pub fn top_left_point(&self) -> Result<Point> {
        Ok(self.pixel_origin()?.subtract(&self.pane_position))
    }

    /// Project-pixel rectangle currently visible in the container
    pub fn pixel_bounds(&self) -> Result<Bounds> {
        let top_left = self.top_left_point()?;
        Ok(Bounds::new(top_left, top_left.add(&self.size)))
    }

    pub fn center(&self) -> Result<LatLng> {
        let center = self.container_point_to_layer_point(&self.size.divide_by(2.0))?;
        self.layer_point_to_lat_lng(&center)
    }

    /// Geographic bounds of the visible area
    pub fn bounds(&self) -> Result<LatLngBounds> {
        let pixel_bounds = self.pixel_bounds()?;
        let south_west = self.unproject(
            &Point::new(pixel_bounds.min.x, pixel_bounds.max.y),
            None,
            true,
        );
        let north_east = self.unproject(
            &Point::new(pixel_bounds.max.x, pixel_bounds.min.y),
            None,
            true,
        );
        Ok(LatLngBounds::new(south_west, north_east))
    }

    /// Recomputes the pixel origin so that `center` sits in the middle of the
    /// container at `zoom`. Returns whether the zoom changed.
    ///
    /// With `preserve_offset` the pane keeps its offset and the origin absorbs
    /// it; otherwise the pane is moved back to zero.
    pub fn reset_view(&mut self, center: &LatLng, zoom: i32, preserve_offset: bool) -> bool {
        let zoom_changed = self.zoom != zoom || self.pixel_origin.is_none();
        self.zoom = zoom;

        let mut origin = self.new_top_left_point(center, Some(zoom));
        if preserve_offset {
            origin.add_mut(&self.pane_position);
        } else {
            self.pane_position = Point::default();
        }
        self.pixel_origin = Some(origin);

        log::debug!("view reset to {} at zoom {} (origin {})", center, zoom, origin);
        zoom_changed
    }

    /// Shifts the panes by `offset` pixels without touching the origin
    pub fn raw_pan_by(&mut self, offset: &Point) {
        self.pane_position.subtract_mut(offset);
    }

    /// Top-left project pixel the container would have when centered on `center`
    pub fn new_top_left_point(&self, center: &LatLng, zoom: Option<i32>) -> Point {
        self.project(center, zoom)
            .subtract(&self.size.divide_by(2.0))
            .round()
    }

    /// Highest zoom at which the bounds fit entirely in the container, or
    /// with `inside` the lowest zoom at which they cover it.
    ///
    /// The fitting search starts one level above the minimum and falls back to
    /// it, so it always yields a zoom. The covering search checks every level
    /// from the minimum to the maximum and yields `None` when none covers.
    pub fn bounds_zoom(&self, bounds: &LatLngBounds, inside: bool) -> Option<i32> {
        let size = self.size;
        let bounds_size_at = |zoom: i32| {
            let north_east = self.project(&bounds.north_east, Some(zoom));
            let south_west = self.project(&bounds.south_west, Some(zoom));
            Point::new(north_east.x - south_west.x, south_west.y - north_east.y)
        };

        if inside {
            (self.min_zoom..=self.max_zoom).find(|&zoom| {
                let bounds_size = bounds_size_at(zoom);
                bounds_size.x >= size.x && bounds_size.y >= size.y
            })
        } else {
            let mut zoom = self.min_zoom;
            while zoom < self.max_zoom {
                let bounds_size = bounds_size_at(zoom + 1);
                if bounds_size.x > size.x || bounds_size.y > size.y {
                    break;
                }
                zoom += 1;
            }
            Some(zoom)
        }
    }

    pub fn lat_lng_to_layer_point(&self, lat_lng: &LatLng) -> Result<Point> {
        let projected = self.project(lat_lng, None).round();
        Ok(projected.subtract(&self.pixel_origin()?))
    }

    pub fn layer_point_to_lat_lng(&self, point: &Point) -> Result<LatLng> {
        let projected = point.add(&self.pixel_origin()?);
        Ok(self.unproject(&projected, None, false))
    }

    pub fn layer_point_to_container_point(&self, point: &Point) -> Result<Point> {
        self.pixel_origin()?;
        Ok(point.add(&self.pane_position))
    }

    pub fn container_point_to_layer_point(&self, point: &Point) -> Result<Point> {
        self.pixel_origin()?;
        Ok(point.subtract(&self.pane_position))
    }

    pub fn lat_lng_to_container_point(&self, lat_lng: &LatLng) -> Result<Point> {
        self.layer_point_to_container_point(&self.lat_lng_to_layer_point(lat_lng)?)
    }

    pub fn container_point_to_lat_lng(&self, point: &Point) -> Result<LatLng> {
        self.layer_point_to_lat_lng(&self.container_point_to_layer_point(point)?)
    }
}
