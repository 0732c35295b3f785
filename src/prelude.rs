//! Prelude module for common slippymap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use slippymap::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    config::{MapOptions, SubdomainsConfig, TileLayerConfig, TileSizeConfig},
    crs::{Crs, EPSG3857, EPSG4326, EPSG900913},
    geo::{LatLng, LatLngBounds, Point},
    map::{LayerId, Map, MapEvent},
    projection::{LonLat, Projection, SphericalMercator},
    transformation::Transformation,
    viewport::{ViewEvent, Viewport},
};

pub use crate::layers::tile::{
    CompletionHandle, MemoryPane, QueuedFetcher, RequestId, Scheme, SurfaceId, TileCompletion,
    TileCoord, TileEvent, TileFetcher, TileKey, TileLayer, TileLayerOptions, TilePane, TileRange,
    TileRequest, TileSize, TileState, TileSurface,
};

#[cfg(feature = "tokio-runtime")]
pub use crate::layers::tile::HttpTileFetcher;

pub use crate::traits::{Evented, ListenerId, Observers};

pub use crate::{Error as MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use instant::Instant;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
