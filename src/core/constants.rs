//! Core constants derived from Leaflet defaults and common web-map conventions.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

use std::time::Duration;

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Earth radius in meters used by haversine distance and EPSG:3857 meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude at which the spherical Mercator Y coordinate would diverge.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// Max margin of error for `LatLng::equals`.
pub const LAT_LNG_MAX_MARGIN: f64 = 1.0e-9;

/// Default zoom limits for tile layers.
pub const DEFAULT_MIN_ZOOM: i32 = 0;
pub const DEFAULT_MAX_ZOOM: i32 = 18;

/// Minimum interval between tile updates triggered by continuous `move` events.
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(150);

/// Transparent 1x1 GIF assigned to evicted tiles so their transfer is dropped.
pub const EMPTY_TILE_SRC: &str =
    "data:image/gif;base64,R0lGODlhAQABAAD/ACwAAAAAAQABAAACADs=";

/// South-west and north-east corners used by `Map::fit_world`.
pub const WORLD_SOUTH_WEST: (f64, f64) = (-60.0, -170.0);
pub const WORLD_NORTH_EAST: (f64, f64) = (85.0, 179.0);

/// Capacity of the in-memory tile byte cache used by the HTTP fetcher.
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 1024;

/// Upper zoom bound used when neither the map nor any layer sets one.
pub const ZOOM_CEILING: i32 = 30;
