//! Map layers. Raster tile layers are the only kind the map manages.

pub mod tile;
