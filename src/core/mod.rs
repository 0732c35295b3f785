//! Core map state: coordinate primitives, the CRS pipeline, viewport and map.

pub mod bounds;
pub mod config;
pub mod constants;
pub mod crs;
pub mod geo;
pub mod map;
pub mod projection;
pub mod transformation;
pub mod viewport;
