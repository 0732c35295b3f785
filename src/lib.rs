//! # slippymap
//!
//! A Rust-native slippy map core inspired by Leaflet.
//!
//! This library provides the coordinate pipeline (projection, affine
//! transformation and zoom scaling bound together as a CRS) and a
//! viewport-driven tile-set manager that decides which tiles cover the
//! view, requests them center-out, and evicts or recycles them as the
//! view moves. Rendering, gestures and animation are left to the host.

pub mod core;
pub mod layers;
pub mod prelude;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::Bounds,
    crs::Crs,
    geo::{LatLng, LatLngBounds, Point},
    map::{LayerId, Map, MapEvent},
    viewport::{ViewEvent, Viewport},
};

pub use layers::tile::{
    MemoryPane, QueuedFetcher, TileEvent, TileFetcher, TileKey, TileLayer, TileLayerOptions,
    TilePane,
};

#[cfg(feature = "tokio-runtime")]
pub use layers::tile::HttpTileFetcher;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("No value provided for template variable {{{0}}}")]
    Template(String),

    #[error("Unknown CRS code: {0}")]
    UnknownCrs(String),

    #[error("Set map center and zoom first")]
    ViewNotSet,

    #[error("Tile fetch failed: {0}")]
    Fetch(String),
}

/// Error type alias for convenience
pub type Error = MapError;
