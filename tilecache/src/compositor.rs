//! Viewport compositor
//!
//! Lays out the tiles covering a viewport and blits whatever the cache chain
//! can offer for each of them onto one surface.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::trace;

use crate::coord::{tiles_per_axis, TileCoord, TILE_SIZE};
use crate::fallback::Renderable;

/// Fill colour of tiles with nothing to show.
pub const BLANK: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// The visible part of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// World pixel of the left edge at `zoom`
    pub map_x: i64,
    /// World pixel of the top edge at `zoom`
    pub map_y: i64,
    pub width: u32,
    pub height: u32,
    pub zoom: u8,
    /// Extra pixels around the viewport whose tiles are also loaded
    pub border: u32,
    /// Draw tiles from one zoom coarser at twice their size
    pub double_pixel: bool,
}

impl Viewport {
    pub fn new(map_x: i64, map_y: i64, width: u32, height: u32, zoom: u8) -> Self {
        Self {
            map_x,
            map_y,
            width,
            height,
            zoom,
            border: 0,
            double_pixel: false,
        }
    }

    /// Zoom level tiles are taken from.
    pub fn tile_zoom(&self) -> u8 {
        if self.double_pixel {
            self.zoom.saturating_sub(1)
        } else {
            self.zoom
        }
    }

    /// Edge length of one tile on the output surface.
    pub fn tile_pixels(&self) -> u32 {
        if self.double_pixel {
            TILE_SIZE * 2
        } else {
            TILE_SIZE
        }
    }
}

/// One tile slot of a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Tile column at the tile zoom, may lie outside the map
    pub x: i64,
    /// Tile row at the tile zoom, may lie outside the map
    pub y: i64,
    pub zoom: u8,
    /// Top-left corner on the output surface
    pub offset_x: i64,
    pub offset_y: i64,
}

impl Placement {
    /// The tile address, or `None` outside `0..2^zoom`.
    pub fn tile(&self) -> Option<TileCoord> {
        let n = tiles_per_axis(self.zoom) as i64;
        if (0..n).contains(&self.x) && (0..n).contains(&self.y) {
            Some(TileCoord::new(self.zoom, self.x as u32, self.y as u32))
        } else {
            None
        }
    }
}

/// Every tile slot touching the viewport plus its border, row by row.
pub fn plan(viewport: &Viewport) -> Vec<Placement> {
    let size = i64::from(viewport.tile_pixels());
    let border = i64::from(viewport.border);
    let left = viewport.map_x - border;
    let top = viewport.map_y - border;
    let right = viewport.map_x + i64::from(viewport.width) + border - 1;
    let bottom = viewport.map_y + i64::from(viewport.height) + border - 1;

    let (x0, x1) = (left.div_euclid(size), right.div_euclid(size));
    let (y0, y1) = (top.div_euclid(size), bottom.div_euclid(size));

    let mut placements = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            placements.push(Placement {
                x,
                y,
                zoom: viewport.tile_zoom(),
                offset_x: x * size - viewport.map_x,
                offset_y: y * size - viewport.map_y,
            });
        }
    }
    placements
}

/// Renders a viewport, asking `load` for each in-range tile.
///
/// Tiles outside the map and tiles `load` has nothing for stay blank.
pub fn compose(
    viewport: &Viewport,
    mut load: impl FnMut(TileCoord) -> Option<Renderable>,
) -> RgbaImage {
    let mut surface = RgbaImage::from_pixel(viewport.width, viewport.height, BLANK);
    let size = viewport.tile_pixels();
    let placements = plan(viewport);
    let mut drawn = 0usize;

    for placement in &placements {
        let Some(tile) = placement.tile() else {
            continue;
        };
        if let Some(renderable) = load(tile) {
            blit(&mut surface, &renderable, placement, size);
            drawn += 1;
        }
    }

    trace!(
        zoom = viewport.zoom,
        slots = placements.len(),
        drawn,
        "Composed viewport"
    );
    surface
}

/// Draws one tile, scaling its crop to `size` pixels.
fn blit(surface: &mut RgbaImage, renderable: &Renderable, placement: &Placement, size: u32) {
    let crop = renderable.crop;
    let region = imageops::crop_imm(renderable.image.as_ref(), crop.x, crop.y, crop.width, crop.height);

    let scaled = if crop.width == size && crop.height == size {
        region.to_image()
    } else {
        // Upscaled ancestors look better smoothed; double-pixel stays crisp
        let filter = if renderable.is_exact() {
            FilterType::Nearest
        } else {
            FilterType::Triangle
        };
        imageops::resize(&region.to_image(), size, size, filter)
    };

    imageops::replace(surface, &scaled, placement.offset_x, placement.offset_y);
}
