use crate::core::config::MapOptions;
use crate::core::constants::{WORLD_NORTH_EAST, WORLD_SOUTH_WEST, ZOOM_CEILING};
use crate::core::crs::Crs;
use crate::core::geo::{LatLng, LatLngBounds, Point};
use crate::core::viewport::{ViewEvent, Viewport};
use crate::layers::tile::TileLayer;
use crate::prelude::Instant;
use crate::traits::{Evented, Observers};
use crate::Result;
use std::fmt;

/// Identifier handed out by [`Map::add_layer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Notifications fired by a [`Map`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    View(ViewEvent),
    LayerAdd(LayerId),
    LayerRemove(LayerId),
    /// Every tile layer finished loading after the last view reset
    TileLayersLoaded,
}

#[derive(Debug)]
struct LayerEntry {
    id: LayerId,
    layer: TileLayer,
    /// `on_add` ran; layers added before the first view wait for it
    attached: bool,
    awaiting_load: bool,
}

/// Owns the viewport and the tile layers, and turns view changes into the
/// event sequence the layers react to.
#[derive(Debug)]
pub struct Map {
    options: MapOptions,
    viewport: Viewport,
    layers: Vec<LayerEntry>,
    next_layer_id: u64,
    bounds_min_zoom: Option<i32>,
    observers: Observers<MapEvent>,
}

impl Map {
    pub fn new(options: MapOptions) -> Result<Self> {
        let crs = Crs::from_code(&options.crs)?;
        let viewport = Viewport::new(crs, options.size);

        let mut map = Self {
            options,
            viewport,
            layers: Vec::new(),
            next_layer_id: 0,
            bounds_min_zoom: None,
            observers: Observers::new(),
        };
        map.refresh_zoom_limits();

        if let Some(bounds) = map.options.max_bounds {
            map.set_max_bounds(Some(bounds))?;
        }
        if let (Some(center), Some(zoom)) = (map.options.center, map.options.zoom) {
            let center = LatLng::new(center.lat, center.lng)?;
            map.set_view(center, zoom)?;
        }
        Ok(map)
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn crs(&self) -> &'static Crs {
        self.viewport.crs()
    }

    pub fn is_loaded(&self) -> bool {
        self.viewport.is_loaded()
    }

    pub fn get_zoom(&self) -> i32 {
        self.viewport.zoom()
    }

    pub fn get_size(&self) -> Point {
        self.viewport.size()
    }

    pub fn get_center(&self) -> Result<LatLng> {
        self.viewport.center()
    }

    pub fn get_bounds(&self) -> Result<LatLngBounds> {
        self.viewport.bounds()
    }

    /// Largest of the map minimum, the smallest layer minimum and the
    /// minimum derived from the max bounds
    pub fn get_min_zoom(&self) -> i32 {
        self.viewport.min_zoom()
    }

    /// Smaller of the map maximum and the largest layer maximum
    pub fn get_max_zoom(&self) -> i32 {
        self.viewport.max_zoom()
    }

    pub fn get_bounds_zoom(&self, bounds: &LatLngBounds, inside: bool) -> Option<i32> {
        self.viewport.bounds_zoom(bounds, inside)
    }

    pub fn set_view(&mut self, center: LatLng, zoom: i32) -> Result<()> {
        let zoom = self.viewport.limit_zoom(zoom);
        self.reset_view(&center, zoom, false, false)
    }

    pub fn set_zoom(&mut self, zoom: i32) -> Result<()> {
        let center = self.get_center()?;
        self.set_view(center, zoom)
    }

    pub fn zoom_in(&mut self) -> Result<()> {
        self.set_zoom(self.viewport.zoom() + 1)
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.set_zoom(self.viewport.zoom() - 1)
    }

    pub fn fit_bounds(&mut self, bounds: &LatLngBounds) -> Result<()> {
        let zoom = self
            .viewport
            .bounds_zoom(bounds, false)
            .unwrap_or(self.viewport.min_zoom());
        self.set_view(bounds.center(), zoom)
    }

    pub fn fit_world(&mut self) -> Result<()> {
        let bounds = LatLngBounds::new(
            LatLng::new(WORLD_SOUTH_WEST.0, WORLD_SOUTH_WEST.1)?,
            LatLng::new(WORLD_NORTH_EAST.0, WORLD_NORTH_EAST.1)?,
        );
        self.fit_bounds(&bounds)
    }

    pub fn pan_to(&mut self, center: LatLng) -> Result<()> {
        self.set_view(center, self.viewport.zoom())
    }

    /// Shifts the view by a pixel offset without resetting it
    pub fn pan_by(&mut self, offset: &Point) -> Result<()> {
        self.fire_view(ViewEvent::MoveStart)?;
        self.viewport.raw_pan_by(offset);
        self.fire_view(ViewEvent::Move)?;
        self.fire_view(ViewEvent::MoveEnd)
    }

    /// Same view transition the zoom animation finishes with: the pane
    /// offset is kept and layers get a soft reset.
    pub fn complete_zoom_animation(&mut self, center: LatLng, zoom: i32) -> Result<()> {
        let zoom = self.viewport.limit_zoom(zoom);
        self.reset_view(&center, zoom, true, true)
    }

    /// Adapts the view to a new container size, keeping the center in place
    pub fn invalidate_size(&mut self, size: Point) -> Result<()> {
        let old_size = self.viewport.set_size(size);

        if let Some(bounds) = self.options.max_bounds {
            self.set_max_bounds(Some(bounds))?;
        }
        if !self.viewport.is_loaded() {
            return Ok(());
        }

        let offset = old_size.subtract(&size).divide_by(2.0).round();
        self.viewport.raw_pan_by(&offset);

        self.fire_view(ViewEvent::Move)?;
        self.fire_view(ViewEvent::MoveEnd)
    }

    /// Restricts the view to `bounds`. The zoom at which the bounds first
    /// cover the container becomes a lower zoom limit, if there is one.
    pub fn set_max_bounds(&mut self, bounds: Option<LatLngBounds>) -> Result<()> {
        self.options.max_bounds = bounds;
        self.bounds_min_zoom = None;
        self.refresh_zoom_limits();

        let Some(bounds) = bounds else {
            return Ok(());
        };

        // bounds that never cover the container impose no zoom limit
        self.bounds_min_zoom = self.viewport.bounds_zoom(&bounds, true);
        self.refresh_zoom_limits();

        if !self.viewport.is_loaded() {
            return Ok(());
        }
        match self.bounds_min_zoom {
            Some(min_zoom) if self.viewport.zoom() < min_zoom => {
                self.set_view(bounds.center(), min_zoom)
            }
            _ => self.pan_inside_bounds(&bounds),
        }
    }

    /// Pans the minimal amount that brings the view inside `bounds`
    pub fn pan_inside_bounds(&mut self, bounds: &LatLngBounds) -> Result<()> {
        let view_bounds = self.viewport.bounds()?;
        let view_sw = self.viewport.project(&view_bounds.south_west, None);
        let view_ne = self.viewport.project(&view_bounds.north_east, None);
        let sw = self.viewport.project(&bounds.south_west, None);
        let ne = self.viewport.project(&bounds.north_east, None);

        let mut dx = 0.0;
        let mut dy = 0.0;

        if view_ne.y < ne.y {
            dy = ne.y - view_ne.y;
        }
        if view_ne.x > ne.x {
            dx = ne.x - view_ne.x;
        }
        if view_sw.y > sw.y {
            dy = sw.y - view_sw.y;
        }
        if view_sw.x < sw.x {
            dx = sw.x - view_sw.x;
        }

        self.pan_by(&Point::new_rounded(dx, dy))
    }

    pub fn set_transition_in_progress(&mut self, in_progress: bool) {
        self.viewport.set_transition_in_progress(in_progress);
    }

    pub fn add_layer(&mut self, layer: TileLayer) -> Result<LayerId> {
        self.next_layer_id += 1;
        let id = LayerId(self.next_layer_id);
        self.layers.push(LayerEntry {
            id,
            layer,
            attached: false,
            awaiting_load: false,
        });
        self.refresh_zoom_limits();

        if self.viewport.is_loaded() {
            self.attach_pending_layers()?;
        }
        Ok(id)
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Option<TileLayer> {
        let index = self.layers.iter().position(|entry| entry.id == id)?;
        let mut entry = self.layers.remove(index);
        entry.layer.on_remove();
        self.refresh_zoom_limits();

        self.fire(MapEvent::LayerRemove(id));
        self.check_tile_layers_loaded();
        Some(entry.layer)
    }

    pub fn has_layer(&self, id: LayerId) -> bool {
        self.layers.iter().any(|entry| entry.id == id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&TileLayer> {
        self.layers
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.layer)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut TileLayer> {
        self.layers
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(|entry| &mut entry.layer)
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|entry| entry.id).collect()
    }

    /// Drains fetch completions into every layer. Returns the number drained.
    pub fn process_completions(&mut self) -> usize {
        let processed = self
            .layers
            .iter_mut()
            .map(|entry| entry.layer.process_completions())
            .sum();
        self.check_tile_layers_loaded();
        processed
    }

    /// Runs any `Move` update the layers deferred for rate limiting
    pub fn tick(&mut self) -> Result<()> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Result<()> {
        for entry in self.layers.iter_mut().filter(|entry| entry.attached) {
            entry.layer.flush_pending(&self.viewport, now)?;
        }
        self.check_tile_layers_loaded();
        Ok(())
    }

    fn reset_view(
        &mut self,
        center: &LatLng,
        zoom: i32,
        preserve_offset: bool,
        after_zoom_animation: bool,
    ) -> Result<()> {
        let first_view = !self.viewport.is_loaded();
        let zoom_changed = first_view || self.viewport.zoom() != zoom;

        if !after_zoom_animation {
            self.fire_view(ViewEvent::MoveStart)?;
            if zoom_changed {
                self.fire_view(ViewEvent::ZoomStart)?;
            }
        }

        self.viewport.reset_view(center, zoom, preserve_offset);

        for entry in self.layers.iter_mut().filter(|entry| entry.attached) {
            entry.layer.take_load_notice();
            entry.awaiting_load = true;
        }

        self.fire_view(ViewEvent::ViewReset {
            hard: !preserve_offset,
        })?;
        self.fire_view(ViewEvent::Move)?;
        if zoom_changed || after_zoom_animation {
            self.fire_view(ViewEvent::ZoomEnd)?;
        }
        self.fire_view(ViewEvent::MoveEnd)?;

        if first_view {
            self.attach_pending_layers()?;
            self.fire_view(ViewEvent::Load)?;
        }
        Ok(())
    }

    fn attach_pending_layers(&mut self) -> Result<()> {
        let mut attached = Vec::new();
        for entry in self.layers.iter_mut().filter(|entry| !entry.attached) {
            entry.layer.take_load_notice();
            entry.attached = true;
            entry.awaiting_load = true;
            entry.layer.on_add(&self.viewport)?;
            attached.push(entry.id);
        }

        for id in attached {
            log::debug!("{} added", id);
            self.fire(MapEvent::LayerAdd(id));
        }
        self.check_tile_layers_loaded();
        Ok(())
    }

    fn fire_view(&mut self, event: ViewEvent) -> Result<()> {
        let now = Instant::now();
        for entry in self.layers.iter_mut().filter(|entry| entry.attached) {
            entry.layer.handle_view_event(&event, &self.viewport, now)?;
        }
        self.fire(MapEvent::View(event));
        self.check_tile_layers_loaded();
        Ok(())
    }

    /// Fires `TileLayersLoaded` when the last awaited layer reports `Load`;
    /// the soft-reset backgrounds are dropped at that point.
    fn check_tile_layers_loaded(&mut self) {
        let mut settled_any = false;
        for entry in &mut self.layers {
            if entry.layer.take_load_notice() && entry.awaiting_load {
                entry.awaiting_load = false;
                settled_any = true;
            }
        }

        let all_loaded = self.layers.iter().all(|entry| !entry.awaiting_load);
        if settled_any && all_loaded && !self.layers.is_empty() {
            for entry in &mut self.layers {
                entry.layer.clear_background();
            }
            self.fire(MapEvent::TileLayersLoaded);
        }
    }

    fn refresh_zoom_limits(&mut self) {
        let layers_min = self
            .layers
            .iter()
            .map(|entry| entry.layer.options().min_zoom)
            .min();
        let layers_max = self
            .layers
            .iter()
            .map(|entry| entry.layer.options().max_zoom)
            .max();

        let min_zoom = self
            .options
            .min_zoom
            .unwrap_or(0)
            .max(layers_min.unwrap_or(0))
            .max(self.bounds_min_zoom.unwrap_or(0));
        let max_zoom = self
            .options
            .max_zoom
            .unwrap_or(ZOOM_CEILING)
            .min(layers_max.unwrap_or(ZOOM_CEILING));

        self.viewport.set_zoom_limits(min_zoom, max_zoom);
    }
}

impl Evented for Map {
    type Event = MapEvent;

    fn observers(&mut self) -> &mut Observers<MapEvent> {
        &mut self.observers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::tile::{QueuedFetcher, TileLayerOptions};
    use crate::prelude::Arc;
    use crate::MapError;
    use std::sync::Mutex;

    fn map_of(width: f64, height: f64) -> Map {
        Map::new(MapOptions::default().with_size(width, height)).unwrap()
    }

    fn record(map: &mut Map) -> Arc<Mutex<Vec<MapEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        map.on(move |event| sink.lock().unwrap().push(*event));
        events
    }

    fn tile_layer(options: TileLayerOptions) -> (TileLayer, QueuedFetcher) {
        let fetcher = QueuedFetcher::new();
        let layer = TileLayer::new("/{z}/{x}/{y}.png", options, Box::new(fetcher.clone())).unwrap();
        (layer, fetcher)
    }

    fn origin() -> LatLng {
        LatLng::new(0.0, 0.0).unwrap()
    }

    #[test]
    fn test_first_view_event_sequence() {
        let mut map = map_of(256.0, 256.0);
        let events = record(&mut map);
        assert!(matches!(map.get_center(), Err(MapError::ViewNotSet)));

        map.set_view(origin(), 2).unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                MapEvent::View(ViewEvent::MoveStart),
                MapEvent::View(ViewEvent::ZoomStart),
                MapEvent::View(ViewEvent::ViewReset { hard: true }),
                MapEvent::View(ViewEvent::Move),
                MapEvent::View(ViewEvent::ZoomEnd),
                MapEvent::View(ViewEvent::MoveEnd),
                MapEvent::View(ViewEvent::Load),
            ]
        );
        assert!(map.is_loaded());
    }

    #[test]
    fn test_same_zoom_view_skips_zoom_events() {
        let mut map = map_of(256.0, 256.0);
        map.set_view(origin(), 2).unwrap();
        let events = record(&mut map);

        map.pan_to(LatLng::new(10.0, 10.0).unwrap()).unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                MapEvent::View(ViewEvent::MoveStart),
                MapEvent::View(ViewEvent::ViewReset { hard: true }),
                MapEvent::View(ViewEvent::Move),
                MapEvent::View(ViewEvent::MoveEnd),
            ]
        );
    }

    #[test]
    fn test_layer_waits_for_first_view() {
        let mut map = map_of(512.0, 512.0);
        let events = record(&mut map);
        let (layer, fetcher) = tile_layer(TileLayerOptions::default());
        let id = map.add_layer(layer).unwrap();
        assert_eq!(fetcher.pending(), 0);

        map.set_view(origin(), 1).unwrap();
        assert_eq!(fetcher.pending(), 4);
        assert!(map.has_layer(id));
        assert!(events.lock().unwrap().contains(&MapEvent::LayerAdd(id)));

        fetcher.resolve_all(Arc::new(vec![0]));
        assert_eq!(map.process_completions(), 4);
        let loaded = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == MapEvent::TileLayersLoaded)
            .count();
        assert_eq!(loaded, 1);
        assert_eq!(map.layer(id).map(|l| l.tile_count()), Some(4));
    }

    #[test]
    fn test_zoom_limits_merge_layers() {
        let mut map = Map::new(MapOptions {
            min_zoom: Some(2),
            ..Default::default()
        })
        .unwrap();
        let (low, _) = tile_layer(TileLayerOptions {
            min_zoom: 0,
            max_zoom: 10,
            ..Default::default()
        });
        let (high, _) = tile_layer(TileLayerOptions {
            min_zoom: 4,
            max_zoom: 12,
            ..Default::default()
        });
        map.add_layer(low).unwrap();
        let high_id = map.add_layer(high).unwrap();

        assert_eq!(map.get_min_zoom(), 2);
        assert_eq!(map.get_max_zoom(), 12);

        assert!(map.remove_layer(high_id).is_some());
        assert!(!map.has_layer(high_id));
        assert_eq!(map.get_max_zoom(), 10);

        map.set_view(origin(), 15).unwrap();
        assert_eq!(map.get_zoom(), 10);
        map.zoom_in().unwrap();
        assert_eq!(map.get_zoom(), 10);
        map.zoom_out().unwrap();
        assert_eq!(map.get_zoom(), 9);
    }

    #[test]
    fn test_fit_world() {
        let mut map = map_of(256.0, 256.0);
        map.fit_world().unwrap();
        assert_eq!(map.get_zoom(), 0);

        // the origin is rounded to whole pixels, under a degree at zoom 0
        let center = map.get_center().unwrap();
        assert!((center.lng - 4.5).abs() < 1.0);
        assert!((center.lat - 12.5).abs() < 1.0);
    }

    #[test]
    fn test_max_bounds_raise_min_zoom() {
        let mut map = map_of(256.0, 256.0);
        map.set_view(origin(), 0).unwrap();

        let bounds = LatLngBounds::from_coords(-60.0, 0.0, 85.0, 180.0).unwrap();
        map.set_max_bounds(Some(bounds)).unwrap();
        assert_eq!(map.get_min_zoom(), 1);
        assert_eq!(map.get_zoom(), 1);

        map.set_max_bounds(None).unwrap();
        assert_eq!(map.get_min_zoom(), 0);
    }

    #[test]
    fn test_max_bounds_that_never_cover_leave_zoom_free() {
        let mut map = Map::new(MapOptions {
            max_zoom: Some(18),
            ..MapOptions::default().with_size(1200.0, 800.0)
        })
        .unwrap();
        map.set_view(origin(), 3).unwrap();
        let events = record(&mut map);

        // about 186px wide even at zoom 18
        let bounds = LatLngBounds::from_coords(0.0, 0.0, 0.001, 0.001).unwrap();
        assert_eq!(map.get_bounds_zoom(&bounds, true), None);
        map.set_max_bounds(Some(bounds)).unwrap();

        assert_eq!(map.get_min_zoom(), 0);
        assert_eq!(map.get_max_zoom(), 18);
        assert_eq!(map.get_zoom(), 3);
        // falls through to a pan rather than a view reset
        assert_eq!(
            events.lock().unwrap().first(),
            Some(&MapEvent::View(ViewEvent::MoveStart))
        );
        assert!(!events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, MapEvent::View(ViewEvent::ViewReset { .. }))));

        map.zoom_out().unwrap();
        assert_eq!(map.get_zoom(), 2);
    }

    #[test]
    fn test_pan_inside_bounds() {
        let mut map = map_of(256.0, 256.0);
        map.set_view(origin(), 2).unwrap();
        let events = record(&mut map);

        let bounds = LatLngBounds::from_coords(-80.0, 10.0, 80.0, 170.0).unwrap();
        map.pan_inside_bounds(&bounds).unwrap();

        assert_eq!(map.viewport().pane_position(), Point::new(-156.0, 0.0));
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                MapEvent::View(ViewEvent::MoveStart),
                MapEvent::View(ViewEvent::Move),
                MapEvent::View(ViewEvent::MoveEnd),
            ]
        );
    }

    #[test]
    fn test_invalidate_size_keeps_center() {
        let mut map = map_of(256.0, 256.0);
        map.set_view(origin(), 2).unwrap();

        map.invalidate_size(Point::new(512.0, 256.0)).unwrap();
        assert_eq!(map.get_size(), Point::new(512.0, 256.0));
        assert_eq!(map.viewport().pane_position(), Point::new(128.0, 0.0));

        let center = map.get_center().unwrap();
        assert!(center.lat.abs() < 1e-9 && center.lng.abs() < 1e-9);
    }

    #[test]
    fn test_unknown_crs() {
        let options = MapOptions {
            crs: "EPSG:1234".into(),
            ..Default::default()
        };
        assert!(matches!(Map::new(options), Err(MapError::UnknownCrs(_))));
    }

    #[test]
    fn test_zoom_animation_soft_reset() {
        let mut map = map_of(256.0, 256.0);
        let (layer, fetcher) = tile_layer(TileLayerOptions::default());
        let id = map.add_layer(layer).unwrap();
        map.set_view(origin(), 2).unwrap();
        fetcher.resolve_all(Arc::new(vec![0]));
        map.process_completions();

        let events = record(&mut map);
        map.complete_zoom_animation(origin(), 3).unwrap();
        assert_eq!(
            events.lock().unwrap()[0],
            MapEvent::View(ViewEvent::ViewReset { hard: false })
        );
        // old surfaces stay as background until the new zoom has loaded
        assert!(map.layer(id).unwrap().background_len() > 0);

        fetcher.resolve_all(Arc::new(vec![0]));
        map.process_completions();
        assert_eq!(map.layer(id).unwrap().background_len(), 0);
        assert!(events.lock().unwrap().contains(&MapEvent::TileLayersLoaded));
    }
}
