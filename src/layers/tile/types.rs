//! Core data types for tile layer functionality

use crate::core::bounds::Bounds;
use crate::core::config::TileLayerConfig;
use crate::core::config::TileSizeConfig;
use crate::core::geo::Point;
use crate::prelude::Arc;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Y-axis convention of the tile server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Row 0 at the top (OSM, Google)
    #[default]
    Xyz,
    /// Row 0 at the bottom
    Tms,
}

/// Tile edge lengths in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub x: u32,
    pub y: u32,
}

impl TileSize {
    pub fn square(size: u32) -> Self {
        Self { x: size, y: size }
    }

    pub fn as_point(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }
}

impl From<TileSizeConfig> for TileSize {
    fn from(config: TileSizeConfig) -> Self {
        match config {
            TileSizeConfig::Square(size) => TileSize::square(size),
            TileSizeConfig::Rect { x, y } => TileSize { x, y },
        }
    }
}

/// Validated options of a [`super::TileLayer`]
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerOptions {
    pub tile_size: TileSize,
    pub min_zoom: i32,
    pub max_zoom: i32,
    pub subdomains: Vec<String>,
    pub error_tile_url: Option<String>,
    pub attribution: Option<String>,
    pub opacity: f32,
    pub scheme: Scheme,
    /// Skip both wrap and drop checks; tile coordinates pass through as-is
    pub continuous_world: bool,
    /// Drop out-of-range columns instead of wrapping them
    pub no_wrap: bool,
    pub zoom_offset: i32,
    pub zoom_reverse: bool,
    /// Evict tiles outside the covering range after every update
    pub unload_invisible_tiles: bool,
    /// Recycle evicted surfaces through the pool; implies eviction
    pub reuse_tiles: bool,
    /// Only update on `MoveEnd`, never while panning
    pub update_when_idle: bool,
    /// Extra values available to the URL template
    pub extra: BTreeMap<String, String>,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        // validation of the default config cannot fail
        Self::from_config(TileLayerConfig::default())
    }
}

impl TileLayerOptions {
    fn from_config(config: TileLayerConfig) -> Self {
        let extra = config.extra_strings();
        Self {
            tile_size: config.tile_size.into(),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            subdomains: config.subdomains.into_list(),
            error_tile_url: config.error_tile_url,
            attribution: config.attribution,
            opacity: config.opacity,
            scheme: config.scheme,
            continuous_world: config.continuous_world,
            no_wrap: config.no_wrap,
            zoom_offset: config.zoom_offset,
            zoom_reverse: config.zoom_reverse,
            unload_invisible_tiles: config.unload_invisible_tiles,
            reuse_tiles: config.reuse_tiles,
            update_when_idle: config.update_when_idle,
            extra,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_size.x == 0 || self.tile_size.y == 0 {
            return Err(MapError::InvalidOptions("tile size must be positive".into()));
        }
        if self.min_zoom > self.max_zoom {
            return Err(MapError::InvalidOptions(format!(
                "min zoom {} exceeds max zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(MapError::InvalidOptions(format!(
                "opacity {} outside 0..=1",
                self.opacity
            )));
        }
        Ok(())
    }

    /// Evicting tiles outside the covering range after each update
    pub fn evicts_invisible(&self) -> bool {
        self.unload_invisible_tiles || self.reuse_tiles
    }
}

impl TryFrom<TileLayerConfig> for TileLayerOptions {
    type Error = MapError;

    fn try_from(config: TileLayerConfig) -> Result<Self> {
        let options = Self::from_config(config);
        options.validate()?;
        Ok(options)
    }
}

/// Grid position of a tile before any wrapping; identifies it in the tile set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub x: i64,
    pub y: i64,
}

impl TileKey {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn as_point(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    pub fn distance_to(&self, point: &Point) -> f64 {
        self.as_point().distance_to(point)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

/// Coordinate sent to the tile server: wrapped, flipped and at the offset zoom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
    pub z: i32,
}

/// Inclusive rectangle of tile grid positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min: TileKey,
    pub max: TileKey,
}

impl TileRange {
    pub fn new(min: TileKey, max: TileKey) -> Self {
        Self { min, max }
    }

    /// Grid positions covering a project-pixel rectangle.
    ///
    /// The minimum edge is floored and the maximum edge is ceiled minus one,
    /// so a tile boundary lying exactly on the rectangle's far edge does not
    /// pull in an extra row or column. `None` for an empty rectangle.
    pub fn covering(pixel_bounds: &Bounds, tile_size: &TileSize) -> Option<Self> {
        let (tx, ty) = (tile_size.x as f64, tile_size.y as f64);
        let min = TileKey::new(
            (pixel_bounds.min.x / tx).floor() as i64,
            (pixel_bounds.min.y / ty).floor() as i64,
        );
        let max = TileKey::new(
            (pixel_bounds.max.x / tx).ceil() as i64 - 1,
            (pixel_bounds.max.y / ty).ceil() as i64 - 1,
        );

        (max.x >= min.x && max.y >= min.y).then_some(Self { min, max })
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        key.x >= self.min.x && key.x <= self.max.x && key.y >= self.min.y && key.y <= self.max.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) as f64 / 2.0,
            (self.min.y + self.max.y) as f64 / 2.0,
        )
    }

    pub fn len(&self) -> usize {
        ((self.max.x - self.min.x + 1) * (self.max.y - self.min.y + 1)) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major iteration, top row first
    pub fn iter(&self) -> impl Iterator<Item = TileKey> + '_ {
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| TileKey::new(x, y)))
    }
}

/// Identity of a drawable tile surface; survives recycling through the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Identity of one fetch; completions carrying a stale id are ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// A drawable placeholder for one tile image
#[derive(Debug, Clone)]
pub struct TileSurface {
    pub id: SurfaceId,
    /// URL the surface shows; the empty GIF once evicted
    pub src: String,
    /// Layer-pixel position of the top-left corner
    pub position: Point,
    pub size: TileSize,
    /// Decoded-by-the-host payload, present once loaded
    pub data: Option<Arc<Vec<u8>>>,
}

impl TileSurface {
    pub fn new(id: SurfaceId, size: TileSize) -> Self {
        Self {
            id,
            src: String::new(),
            position: Point::default(),
            size,
            data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileState {
    Loading,
    Loaded,
    /// The fetch failed; the surface may show the error placeholder
    Errored(String),
}

/// A tile present in the layer's tile set
#[derive(Debug, Clone)]
pub struct Tile {
    pub key: TileKey,
    pub coord: TileCoord,
    pub url: String,
    pub surface: TileSurface,
    pub state: TileState,
    pub request_id: RequestId,
}

impl Tile {
    pub fn is_loading(&self) -> bool {
        self.state == TileState::Loading
    }
}
