//! Tile layer implementation
//!
//! This module provides the viewport-driven tile set manager:
//! - covering-grid computation and center-out request ordering
//! - wrap/drop policy for tiles outside the world
//! - eviction of invisible tiles and surface recycling
//! - the fetch and placement seams the host plugs into

pub mod cache;
pub mod layer;
pub mod loader;
pub mod pane;
pub mod scheduler;
pub mod source;
pub mod types;

pub use cache::TileCache;
pub use layer::{TileEvent, TileLayer};
#[cfg(feature = "tokio-runtime")]
pub use loader::HttpTileFetcher;
pub use loader::{CompletionHandle, QueuedFetcher, TileCompletion, TileFetcher, TileRequest};
pub use pane::{MemoryPane, PlacedSurface, TilePane};
pub use scheduler::{center_out_queue, UpdateThrottle};
pub use source::UrlTemplate;
pub use types::{
    RequestId, Scheme, SurfaceId, Tile, TileCoord, TileKey, TileLayerOptions, TileRange,
    TileSize, TileState, TileSurface,
};
