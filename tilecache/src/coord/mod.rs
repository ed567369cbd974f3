//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and slippy map tile coordinates, plus the quadtree key encodings used by
//! some tile servers.

mod types;

pub use types::{
    tiles_per_axis, CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM, TILE_SIZE,
};

use std::f64::consts::PI;

/// Quadrant alphabet for `t`-prefixed keys (`#Q` token).
pub const QUADTREE_LETTERS: [char; 4] = ['q', 'r', 't', 's'];

/// Quadrant alphabet for numeric keys (`#W` token).
pub const QUADTREE_DIGITS: [char; 4] = ['0', '1', '2', '3'];

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 30)
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = tiles_per_axis(zoom) as f64;
    let max_index = tiles_per_axis(zoom) - 1;

    let x = ((lon + 180.0) / 360.0 * n) as u64;

    // Web Mercator projection
    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u64;

    // lon = 180 lands exactly on the far edge
    Ok(TileCoord {
        x: x.min(max_index) as u32,
        y: y.min(max_index) as u32,
        zoom,
    })
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = tiles_per_axis(tile.zoom) as f64;

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// World pixel of a geographic point at `zoom`.
///
/// The map at `zoom` is `2^zoom * 256` pixels square with the origin at the
/// northwest corner.
pub fn to_world_pixel(lat: f64, lon: f64, zoom: u8) -> Result<(i64, i64), CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let size = tiles_per_axis(zoom) as f64 * TILE_SIZE as f64;
    let lat_rad = lat * PI / 180.0;
    let x = (lon + 180.0) / 360.0 * size;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * size;
    Ok((x.floor() as i64, y.floor() as i64))
}

/// Encodes a tile address as a quadtree string.
///
/// One character is emitted per zoom level, reading the `(x, y)` bit pairs
/// from the most significant level down. Each pair selects
/// `alphabet[x_bit + 2 * y_bit]`. An optional prefix character is written
/// first.
pub fn to_quadtree(tile: &TileCoord, prefix: Option<char>, alphabet: &[char; 4]) -> String {
    let mut key = String::with_capacity(tile.zoom as usize + 1);
    if let Some(c) = prefix {
        key.push(c);
    }

    for level in (0..tile.zoom).rev() {
        let x_bit = ((tile.x >> level) & 1) as usize;
        let y_bit = ((tile.y >> level) & 1) as usize;
        key.push(alphabet[x_bit + 2 * y_bit]);
    }

    key
}

/// Quadtree key in the `t`-prefixed `qrts` form.
#[inline]
pub fn quadtree_key(tile: &TileCoord) -> String {
    to_quadtree(tile, Some('t'), &QUADTREE_LETTERS)
}

/// Quadtree key in the numeric `0123` form.
#[inline]
pub fn quadtree_digits(tile: &TileCoord) -> String {
    to_quadtree(tile, None, &QUADTREE_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_york_city_at_zoom_16() {
        let tile = to_tile_coords(40.7128, -74.0060, 16).unwrap();
        assert_eq!(tile.y, 24640);
        assert_eq!(tile.x, 19295);
        assert_eq!(tile.zoom, 16);
    }

    #[test]
    fn test_equator_prime_meridian() {
        let tile = to_tile_coords(0.0, 0.0, 1).unwrap();
        assert_eq!(tile, TileCoord::new(1, 1, 1));
    }

    #[test]
    fn test_far_east_edge_is_clamped() {
        let tile = to_tile_coords(0.0, 180.0, 3).unwrap();
        assert_eq!(tile.x, 7);
    }

    #[test]
    fn test_invalid_latitude() {
        let result = to_tile_coords(90.0, 0.0, 10);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_invalid_longitude() {
        let result = to_tile_coords(0.0, 181.0, 10);
        assert!(matches!(result, Err(CoordError::InvalidLongitude(_))));
    }

    #[test]
    fn test_invalid_zoom() {
        let result = to_tile_coords(0.0, 0.0, 31);
        assert!(matches!(result, Err(CoordError::InvalidZoom(31))));
    }

    #[test]
    fn test_roundtrip_at_different_zooms() {
        let lat = 51.5074; // London
        let lon = -0.1278;

        for zoom in [0, 5, 10, 15, 18] {
            let tile = to_tile_coords(lat, lon, zoom).unwrap();
            let (converted_lat, converted_lon) = tile_to_lat_lon(&tile);

            // northwest corner, so allow one full tile of slack
            let tile_size_degrees = 360.0 / (2.0_f64.powi(zoom as i32));
            assert!((converted_lat - lat).abs() < tile_size_degrees);
            assert!((converted_lon - lon).abs() < tile_size_degrees);
        }
    }

    #[test]
    fn test_world_pixel_agrees_with_tile() {
        let (px, py) = to_world_pixel(40.7128, -74.0060, 16).unwrap();
        assert_eq!(px / TILE_SIZE as i64, 19295);
        assert_eq!(py / TILE_SIZE as i64, 24640);
    }

    #[test]
    fn test_world_pixel_origin_and_center() {
        assert_eq!(to_world_pixel(0.0, 0.0, 1).unwrap(), (256, 256));
        assert_eq!(to_world_pixel(0.0, -180.0, 0).unwrap().0, 0);
    }

    #[test]
    fn test_quadtree_key_two_levels() {
        // level 1: (0,0) -> q, level 0: (1,1) -> s
        let tile = TileCoord::new(2, 1, 1);
        assert_eq!(quadtree_key(&tile), "tqs");
        assert_eq!(quadtree_digits(&tile), "03");
    }

    #[test]
    fn test_quadtree_matches_bing_reference() {
        // Bing's documented example: tile (3, 5) at level 3 is "213"
        let tile = TileCoord::new(3, 3, 5);
        assert_eq!(quadtree_digits(&tile), "213");
        assert_eq!(quadtree_key(&tile), "ttrs");
    }

    #[test]
    fn test_quadtree_zoom_zero() {
        let tile = TileCoord::new(0, 0, 0);
        assert_eq!(quadtree_key(&tile), "t");
        assert_eq!(quadtree_digits(&tile), "");
    }

    #[test]
    fn test_ancestor() {
        let tile = TileCoord::new(5, 13, 22);
        assert_eq!(tile.ancestor(0), Some(tile));
        assert_eq!(tile.ancestor(2), Some(TileCoord::new(3, 3, 5)));
        assert_eq!(tile.ancestor(5), Some(TileCoord::new(0, 0, 0)));
        assert_eq!(tile.ancestor(6), None);
    }

    #[test]
    fn test_ancestor_beyond_index_width() {
        let tile = TileCoord::new(40, u32::MAX, 7);
        assert_eq!(tile.ancestor(32), Some(TileCoord::new(8, 0, 0)));
        assert_eq!(tile.ancestor(40), Some(TileCoord::new(0, 0, 0)));
    }

    #[test]
    fn test_is_in_range() {
        assert!(TileCoord::new(2, 3, 3).is_in_range());
        assert!(!TileCoord::new(2, 4, 0).is_in_range());
        assert!(!TileCoord::new(0, 0, 1).is_in_range());
    }

    proptest! {
        #[test]
        fn prop_quadtree_length_tracks_zoom(zoom in 0u8..=20, x in 0u32..1_000_000, y in 0u32..1_000_000) {
            let n = tiles_per_axis(zoom) as u32;
            let tile = TileCoord::new(zoom, x % n, y % n);
            prop_assert_eq!(quadtree_key(&tile).len(), zoom as usize + 1);
            prop_assert_eq!(quadtree_digits(&tile).len(), zoom as usize);
        }

        #[test]
        fn prop_quadtree_parent_is_prefix(zoom in 1u8..=20, x in 0u32..1_000_000, y in 0u32..1_000_000) {
            let n = tiles_per_axis(zoom) as u32;
            let tile = TileCoord::new(zoom, x % n, y % n);
            let parent = tile.ancestor(1).unwrap();
            let key = quadtree_digits(&tile);
            prop_assert!(key.starts_with(&quadtree_digits(&parent)));
        }
    }
}
