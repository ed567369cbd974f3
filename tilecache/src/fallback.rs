//! Pyramid-upscaling fallback.
//!
//! When a tile is not cached yet, the closest cached ancestor is shown
//! instead: the quarter (or sixteenth, ...) of the ancestor that covers the
//! requested tile, scaled up to full size.

use crate::codec::TileImage;
use crate::coord::TileCoord;

/// Source rectangle inside a tile image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// The whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// An image and the part of it to draw for a tile.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub image: TileImage,
    pub crop: CropRect,
    /// `2^depth`, 1 for the exact tile
    pub scale_modulo: u32,
    /// Zoom level the image was found at
    pub zoom: u8,
}

impl Renderable {
    /// The exact tile, drawn whole.
    pub fn exact(image: TileImage, zoom: u8) -> Self {
        let crop = CropRect::full(image.width(), image.height());
        Self {
            image,
            crop,
            scale_modulo: 1,
            zoom,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.scale_modulo == 1
    }
}

/// Cache chain consulted by the fallback search.
pub trait TileLookup {
    /// Returns the decoded tile if it is in memory or on disk.
    fn lookup(&mut self, tile: TileCoord) -> Option<TileImage>;
}

/// Finds the best image available for `tile`.
///
/// Tries the tile itself, then every ancestor from `zoom - 1` down to 0, and
/// returns the first hit.
pub fn find_renderable(lookup: &mut impl TileLookup, tile: TileCoord) -> Option<Renderable> {
    for depth in 0..=tile.zoom {
        let Some(ancestor) = tile.ancestor(depth) else {
            break;
        };
        if let Some(image) = lookup.lookup(ancestor) {
            return Some(ancestor_crop(image, tile, depth));
        }
    }
    None
}

/// Part of an ancestor image `depth` levels up that covers `tile`.
fn ancestor_crop(image: TileImage, tile: TileCoord, depth: u8) -> Renderable {
    if depth == 0 {
        return Renderable::exact(image, tile.zoom);
    }

    let modulo = 1u32 << depth.min(31);
    let width = (image.width() / modulo).max(1);
    let height = (image.height() / modulo).max(1);
    let crop = CropRect {
        x: ((tile.x % modulo) * width).min(image.width().saturating_sub(width)),
        y: ((tile.y % modulo) * height).min(image.height().saturating_sub(height)),
        width,
        height,
    };

    Renderable {
        image,
        crop,
        scale_modulo: modulo,
        zoom: tile.zoom - depth,
    }
}
