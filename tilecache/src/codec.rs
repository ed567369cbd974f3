//! Tile image decoding.

use std::sync::Arc;

use image::RgbaImage;
use thiserror::Error;

/// A decoded tile surface, shared between the cache and renderers.
pub type TileImage = Arc<RgbaImage>;

/// Image decode errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No bytes to decode
    #[error("Empty tile data")]
    Empty,

    /// Codec rejected the data
    #[error("Failed to decode tile image: {0}")]
    Image(#[from] image::ImageError),
}

/// Decodes encoded tile bytes into a surface.
pub trait TileDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<TileImage, DecodeError>;
}

/// Decoder backed by the `image` crate, guessing the format from the data.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl TileDecoder for ImageDecoder {
    fn decode(&self, data: &[u8]) -> Result<TileImage, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::Empty);
        }
        let image = image::load_from_memory(data)?;
        Ok(Arc::new(image.to_rgba8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn encode(image: &RgbaImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let source = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let decoded = ImageDecoder.decode(&encode(&source, ImageFormat::Png)).unwrap();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(3, 3), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(ImageDecoder.decode(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_decode_garbage() {
        let result = ImageDecoder.decode(b"<html>not found</html>");
        assert!(matches!(result, Err(DecodeError::Image(_))));
    }
}
