//! Core TileLayer implementation

use super::loader::{CompletionHandle, TileCompletion, TileFetcher, TileRequest};
use super::pane::{MemoryPane, TilePane};
use super::scheduler::{center_out_queue, UpdateThrottle};
use super::source::UrlTemplate;
use super::types::{
    RequestId, Scheme, SurfaceId, Tile, TileCoord, TileKey, TileLayerOptions, TileRange,
    TileState, TileSurface,
};
use crate::core::config::TileLayerConfig;
use crate::core::constants::EMPTY_TILE_SRC;
use crate::core::geo::Point;
use crate::core::viewport::{ViewEvent, Viewport};
use crate::prelude::{Duration, HashMap, Instant};
use crate::traits::{Evented, Observers};
use crate::{MapError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;

/// Notifications fired by a [`TileLayer`]
#[derive(Debug, Clone, PartialEq)]
pub enum TileEvent {
    TileLoad {
        key: TileKey,
        surface_id: SurfaceId,
        url: String,
    },
    TileError {
        key: TileKey,
        surface_id: SurfaceId,
        url: String,
        error: String,
    },
    TileUnload {
        key: TileKey,
        surface_id: SurfaceId,
        url: String,
    },
    /// Every requested tile has settled
    Load,
}

/// Keeps the set of tiles covering the viewport: requests the missing ones
/// center-out, evicts the ones that scrolled away and recycles their
/// surfaces.
pub struct TileLayer {
    options: TileLayerOptions,
    template: UrlTemplate,
    fetcher: Box<dyn TileFetcher>,
    pane: Box<dyn TilePane>,
    tiles: HashMap<TileKey, Tile>,
    in_flight: HashMap<RequestId, TileKey>,
    /// Evicted surfaces waiting for reuse, popped from the back
    pool: Vec<TileSurface>,
    /// Surfaces kept attached across a soft reset
    background: Vec<TileSurface>,
    tiles_to_load: usize,
    next_surface_id: u64,
    next_request_id: u64,
    completions_tx: Sender<TileCompletion>,
    completions_rx: Receiver<TileCompletion>,
    throttle: UpdateThrottle,
    load_notice: bool,
    observers: Observers<TileEvent>,
}

impl TileLayer {
    pub fn new(
        url_template: &str,
        options: TileLayerOptions,
        fetcher: Box<dyn TileFetcher>,
    ) -> Result<Self> {
        options.validate()?;
        let template = UrlTemplate::parse(url_template, &options.extra, &options.subdomains)?;
        let (completions_tx, completions_rx) = unbounded();

        Ok(Self {
            options,
            template,
            fetcher,
            pane: Box::new(MemoryPane::new()),
            tiles: HashMap::default(),
            in_flight: HashMap::default(),
            pool: Vec::new(),
            background: Vec::new(),
            tiles_to_load: 0,
            next_surface_id: 0,
            next_request_id: 0,
            completions_tx,
            completions_rx,
            throttle: UpdateThrottle::default(),
            load_notice: false,
            observers: Observers::new(),
        })
    }

    /// Builds a layer from raw configuration, validating it first
    pub fn from_config(
        url_template: &str,
        config: TileLayerConfig,
        fetcher: Box<dyn TileFetcher>,
    ) -> Result<Self> {
        Self::new(url_template, TileLayerOptions::try_from(config)?, fetcher)
    }

    pub fn with_pane(mut self, pane: Box<dyn TilePane>) -> Self {
        self.pane = pane;
        self
    }

    /// Overrides the rate limit applied to `Move`-driven updates
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.throttle = UpdateThrottle::new(interval);
        self
    }

    pub fn options(&self) -> &TileLayerOptions {
        &self.options
    }

    pub fn url_template(&self) -> &str {
        self.template.as_str()
    }

    pub fn attribution(&self) -> Option<&str> {
        self.options.attribution.as_deref()
    }

    pub fn opacity(&self) -> f32 {
        self.options.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(MapError::InvalidOptions(format!(
                "opacity {} outside 0..=1",
                opacity
            )));
        }
        self.options.opacity = opacity;
        self.pane.set_opacity(opacity);
        Ok(())
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn tile(&self, key: &TileKey) -> Option<&Tile> {
        self.tiles.get(key)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn background_len(&self) -> usize {
        self.background.len()
    }

    /// Tiles requested but not yet settled
    pub fn tiles_to_load(&self) -> usize {
        self.tiles_to_load
    }

    pub fn is_loading(&self) -> bool {
        self.tiles_to_load > 0
    }

    /// Zoom sent to the tile server for a map zoom
    pub fn offset_zoom(&self, zoom: i32) -> i32 {
        let zoom = if self.options.zoom_reverse {
            self.options.max_zoom - zoom
        } else {
            zoom
        };
        zoom + self.options.zoom_offset
    }

    pub fn get_tile_url(&self, coord: &TileCoord) -> String {
        self.template
            .render(coord, &self.options.subdomains, &self.options.extra)
    }

    /// Attaches the layer to a loaded view and requests its first tiles
    pub fn on_add(&mut self, viewport: &Viewport) -> Result<()> {
        self.pane.set_opacity(self.options.opacity);
        self.reset(false);
        self.update(viewport)
    }

    /// Detaches every surface; the layer can be added again later
    pub fn on_remove(&mut self) {
        self.reset(true);
    }

    /// Reacts to a view notification from the map
    pub fn handle_view_event(
        &mut self,
        event: &ViewEvent,
        viewport: &Viewport,
        now: Instant,
    ) -> Result<()> {
        match event {
            ViewEvent::ViewReset { hard } => self.reset(*hard),
            ViewEvent::MoveEnd => self.update(viewport)?,
            ViewEvent::Move if !self.options.update_when_idle => {
                if self.throttle.request(now) {
                    self.update(viewport)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Runs a `Move` update deferred by the rate limit, if one is due.
    /// Returns whether an update ran.
    pub fn flush_pending(&mut self, viewport: &Viewport, now: Instant) -> Result<bool> {
        if self.options.update_when_idle || !self.throttle.poll(now) {
            return Ok(false);
        }
        self.update(viewport)?;
        Ok(true)
    }

    /// Drops every tile. A hard reset also detaches all surfaces from the
    /// pane; a soft one leaves them attached as a background until
    /// [`TileLayer::clear_background`].
    pub fn reset(&mut self, hard: bool) {
        let mut tiles: Vec<Tile> = std::mem::take(&mut self.tiles).into_values().collect();
        tiles.sort_by_key(|tile| tile.key);

        for tile in &tiles {
            self.fire(TileEvent::TileUnload {
                key: tile.key,
                surface_id: tile.surface.id,
                url: tile.surface.src.clone(),
            });
        }

        self.in_flight.clear();
        self.tiles_to_load = 0;
        if self.options.reuse_tiles {
            self.pool.clear();
        }

        if hard {
            self.background.clear();
            self.pane.clear();
        } else {
            self.background
                .extend(tiles.into_iter().map(|tile| tile.surface));
        }
        log::debug!("tile layer reset (hard: {})", hard);
    }

    /// Detaches the surfaces kept by a soft reset
    pub fn clear_background(&mut self) {
        for surface in self.background.drain(..) {
            self.pane.remove(&surface);
        }
    }

    /// Brings the tile set in line with the viewport
    pub fn update(&mut self, viewport: &Viewport) -> Result<()> {
        if viewport.transition_in_progress() {
            log::trace!("skipping tile update during transition");
            return Ok(());
        }

        let zoom = viewport.zoom();
        if zoom < self.options.min_zoom || zoom > self.options.max_zoom {
            return Ok(());
        }

        let pixel_bounds = viewport.pixel_bounds()?;
        let Some(range) = TileRange::covering(&pixel_bounds, &self.options.tile_size) else {
            return Ok(());
        };

        self.add_tiles_from_center_out(&range, zoom, &viewport.pixel_origin()?);

        if self.options.evicts_invisible() {
            self.remove_other_tiles(&range);
        }
        Ok(())
    }

    fn add_tiles_from_center_out(&mut self, range: &TileRange, zoom: i32, origin: &Point) {
        let queue = center_out_queue(range, |key| self.tiles.contains_key(key));
        if queue.is_empty() {
            return;
        }

        #[cfg(feature = "debug")]
        log::debug!("requesting {} tiles at zoom {}", queue.len(), zoom);
        self.tiles_to_load += queue.len();
        for key in queue {
            self.add_tile(key, zoom, origin);
        }
    }

    fn add_tile(&mut self, key: TileKey, zoom: i32, origin: &Point) {
        let offset_zoom = self.offset_zoom(zoom);
        let limit = 1_i64 << offset_zoom.clamp(0, 62);
        let mut coord = TileCoord {
            x: key.x,
            y: key.y,
            z: offset_zoom,
        };

        if !self.options.continuous_world {
            if !self.options.no_wrap {
                coord.x = coord.x.rem_euclid(limit);
            } else if coord.x < 0 || coord.x >= limit {
                log::trace!("dropping tile {} outside the world", key);
                self.tile_settled();
                return;
            }

            if coord.y < 0 || coord.y >= limit {
                log::trace!("dropping tile {} outside the world", key);
                self.tile_settled();
                return;
            }
        }

        if self.options.scheme == Scheme::Tms {
            coord.y = limit - coord.y - 1;
        }

        let url = self.get_tile_url(&coord);
        let mut surface = self.acquire_surface();
        surface.position = key
            .as_point()
            .scale_by(&self.options.tile_size.as_point())
            .subtract(origin);
        surface.src = url.clone();

        self.next_request_id += 1;
        let request_id = RequestId(self.next_request_id);
        let request = TileRequest {
            request_id,
            surface_id: surface.id,
            key,
            coord,
            url: url.clone(),
        };
        let done = CompletionHandle::new(request_id, surface.id, self.completions_tx.clone());

        self.pane.append(&surface);
        self.tiles.insert(
            key,
            Tile {
                key,
                coord,
                url,
                surface,
                state: TileState::Loading,
                request_id,
            },
        );
        self.in_flight.insert(request_id, key);
        self.fetcher.fetch(request, done);
    }

    fn acquire_surface(&mut self) -> TileSurface {
        if self.options.reuse_tiles {
            if let Some(mut surface) = self.pool.pop() {
                self.reset_tile(&mut surface);
                return surface;
            }
        }
        self.next_surface_id += 1;
        TileSurface::new(SurfaceId(self.next_surface_id), self.options.tile_size)
    }

    /// Cleans a pooled surface before it shows another tile
    fn reset_tile(&mut self, surface: &mut TileSurface) {
        surface.data = None;
        surface.src.clear();
        self.pane.reset_surface(surface);
    }

    fn remove_other_tiles(&mut self, range: &TileRange) {
        let mut outside: Vec<TileKey> = self
            .tiles
            .keys()
            .filter(|key| !range.contains(key))
            .copied()
            .collect();
        outside.sort();

        for key in outside {
            self.remove_tile(&key);
        }
    }

    fn remove_tile(&mut self, key: &TileKey) {
        let Some(tile) = self.tiles.remove(key) else {
            return;
        };
        log::trace!("evicting tile {}", key);

        self.fire(TileEvent::TileUnload {
            key: tile.key,
            surface_id: tile.surface.id,
            url: tile.surface.src.clone(),
        });
        self.pane.remove(&tile.surface);

        if self.in_flight.remove(&tile.request_id).is_some() {
            self.tile_settled();
        }

        let mut surface = tile.surface;
        surface.src = EMPTY_TILE_SRC.to_string();
        surface.data = None;
        if self.options.reuse_tiles {
            self.pool.push(surface);
        }
    }

    /// Applies every fetch completion received so far. Returns how many
    /// completions were drained, stale ones included.
    pub fn process_completions(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.handle_completion(completion);
            processed += 1;
        }
        processed
    }

    fn handle_completion(&mut self, completion: TileCompletion) {
        let Some(key) = self.in_flight.remove(&completion.request_id) else {
            log::trace!("ignoring stale completion {}", completion.request_id);
            return;
        };
        let Some(tile) = self.tiles.get_mut(&key) else {
            return;
        };

        let event = match completion.result {
            Ok(data) => {
                tile.state = TileState::Loaded;
                tile.surface.data = Some(data);
                TileEvent::TileLoad {
                    key,
                    surface_id: tile.surface.id,
                    url: tile.url.clone(),
                }
            }
            Err(e) => {
                log::warn!("tile {} failed to load: {}", key, e);
                let error = e.to_string();
                tile.state = TileState::Errored(error.clone());
                if let Some(error_url) = &self.options.error_tile_url {
                    tile.surface.src = error_url.clone();
                }
                TileEvent::TileError {
                    key,
                    surface_id: tile.surface.id,
                    url: tile.url.clone(),
                    error,
                }
            }
        };

        self.fire(event);
        self.tile_settled();
    }

    fn tile_settled(&mut self) {
        self.tiles_to_load = self.tiles_to_load.saturating_sub(1);
        if self.tiles_to_load == 0 {
            self.load_notice = true;
            self.fire(TileEvent::Load);
        }
    }

    /// Returns and clears the "fired Load" flag; used by the map to know
    /// when every layer has finished.
    pub(crate) fn take_load_notice(&mut self) -> bool {
        std::mem::take(&mut self.load_notice)
    }
}

impl Evented for TileLayer {
    type Event = TileEvent;

    fn observers(&mut self) -> &mut Observers<TileEvent> {
        &mut self.observers
    }
}

impl fmt::Debug for TileLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileLayer")
            .field("url_template", &self.template.as_str())
            .field("tiles", &self.tiles.len())
            .field("tiles_to_load", &self.tiles_to_load)
            .field("pool", &self.pool.len())
            .finish()
    }
}
