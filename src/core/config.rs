//! Serializable configuration for maps and tile layers.
//!
//! These structs mirror the option bags a host would load from JSON. They are
//! deliberately loose (`Option`s, untagged unions) and get validated when
//! turned into [`crate::layers::tile::TileLayerOptions`] or a [`crate::Map`].

use crate::core::constants::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, TILE_SIZE};
use crate::core::geo::{LatLng, LatLngBounds, Point};
use crate::layers::tile::Scheme;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Options used to construct a [`crate::Map`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapOptions {
    /// CRS code, e.g. `"EPSG:3857"`
    pub crs: String,
    /// Container size in pixels
    pub size: Point,
    /// Initial view; the map stays unloaded until both are known
    pub center: Option<LatLng>,
    pub zoom: Option<i32>,
    pub min_zoom: Option<i32>,
    pub max_zoom: Option<i32>,
    pub max_bounds: Option<LatLngBounds>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            crs: "EPSG:3857".to_string(),
            size: Point::new(TILE_SIZE as f64, TILE_SIZE as f64),
            center: None,
            zoom: None,
            min_zoom: None,
            max_zoom: None,
            max_bounds: None,
        }
    }
}

impl MapOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Point::new(width, height);
        self
    }

    pub fn with_view(mut self, center: LatLng, zoom: i32) -> Self {
        self.center = Some(center);
        self.zoom = Some(zoom);
        self
    }
}

/// Tile size given either as a single edge length or as `{ "x": .., "y": .. }`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileSizeConfig {
    Square(u32),
    Rect { x: u32, y: u32 },
}

impl Default for TileSizeConfig {
    fn default() -> Self {
        TileSizeConfig::Square(TILE_SIZE)
    }
}

/// Subdomains given either as a string of single characters (`"abc"`) or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubdomainsConfig {
    Chars(String),
    List(Vec<String>),
}

impl Default for SubdomainsConfig {
    fn default() -> Self {
        SubdomainsConfig::Chars("abc".to_string())
    }
}

impl SubdomainsConfig {
    pub fn into_list(self) -> Vec<String> {
        match self {
            SubdomainsConfig::Chars(chars) => chars.chars().map(|c| c.to_string()).collect(),
            SubdomainsConfig::List(list) => list,
        }
    }
}

/// Raw tile layer options, as found in a JSON layer definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TileLayerConfig {
    pub tile_size: TileSizeConfig,
    pub subdomains: SubdomainsConfig,
    pub min_zoom: i32,
    pub max_zoom: i32,
    pub no_wrap: bool,
    pub continuous_world: bool,
    pub scheme: Scheme,
    pub zoom_offset: i32,
    pub zoom_reverse: bool,
    pub unload_invisible_tiles: bool,
    pub reuse_tiles: bool,
    pub update_when_idle: bool,
    pub error_tile_url: Option<String>,
    pub attribution: Option<String>,
    pub opacity: f32,
    /// Any other keys; their values are available to the URL template
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for TileLayerConfig {
    fn default() -> Self {
        Self {
            tile_size: TileSizeConfig::default(),
            subdomains: SubdomainsConfig::default(),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            no_wrap: false,
            continuous_world: false,
            scheme: Scheme::Xyz,
            zoom_offset: 0,
            zoom_reverse: false,
            unload_invisible_tiles: false,
            reuse_tiles: false,
            update_when_idle: false,
            error_tile_url: None,
            attribution: None,
            opacity: 1.0,
            extra: BTreeMap::new(),
        }
    }
}

impl TileLayerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Extra options flattened to strings for template substitution
    pub fn extra_strings(&self) -> BTreeMap<String, String> {
        self.extra
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect()
    }
}
