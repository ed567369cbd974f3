//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels addressable with 32-bit tile indices
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 30;

/// Edge length of a tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Tile coordinates in the slippy map (XYZ) system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Column (west to east), 0 at the antimeridian
    pub x: u32,
    /// Row (north to south), 0 at the north edge
    pub y: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[inline]
    pub const fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { x, y, zoom }
    }

    /// Returns the ancestor tile `depth` levels coarser that covers this tile.
    ///
    /// Returns `None` when `depth` would go below zoom 0.
    #[inline]
    pub fn ancestor(&self, depth: u8) -> Option<TileCoord> {
        if depth > self.zoom {
            return None;
        }
        let shift = u32::from(depth);
        Some(TileCoord {
            x: self.x.checked_shr(shift).unwrap_or(0),
            y: self.y.checked_shr(shift).unwrap_or(0),
            zoom: self.zoom - depth,
        })
    }

    /// Checks whether both indices lie inside `0..2^zoom`.
    #[inline]
    pub fn is_in_range(&self) -> bool {
        let n = tiles_per_axis(self.zoom);
        u64::from(self.x) < n && u64::from(self.y) < n
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Number of tiles along one axis at the given zoom level.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u64 {
    1u64 << zoom.min(63)
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is outside valid range (-85.05112878 to 85.05112878)
    #[error("Invalid latitude: {0} (must be between {min} and {max})", min = MIN_LAT, max = MAX_LAT)]
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    #[error("Invalid longitude: {0} (must be between {min} and {max})", min = MIN_LON, max = MAX_LON)]
    InvalidLongitude(f64),
    /// Zoom level is outside valid range
    #[error("Invalid zoom level: {0} (must be between {min} and {max})", min = MIN_ZOOM, max = MAX_ZOOM)]
    InvalidZoom(u8),
}
