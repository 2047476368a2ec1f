//! Drawable surfaces produced by the rasterizer

use std::io::Cursor;
use std::sync::Arc;

use image::DynamicImage;

use crate::document::{DocumentError, DocumentResult};

/// One rasterized page.
///
/// Tagged with the render generation it was requested under so the session
/// can discard it when a later page or zoom change has already been issued.
#[derive(Debug, Clone)]
pub struct Surface {
    /// One-based page number
    pub page: usize,
    pub scale: f32,
    pub generation: u64,
    pub width: u32,
    pub height: u32,
    /// RGBA8, `width * height * 4` bytes
    pub pixels: Arc<Vec<u8>>,
}

impl Surface {
    /// Same pixels, re-tagged for a newer generation
    pub fn for_generation(&self, generation: u64) -> Self {
        Self {
            generation,
            ..self.clone()
        }
    }

    /// Encode as PNG for the UI shell
    pub fn to_png(&self) -> DocumentResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.pixels.to_vec())
            .ok_or_else(|| DocumentError::ImageError("Failed to create image buffer".to_string()))?;

        let mut output = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_encoding_keeps_dimensions() {
        let surface = Surface {
            page: 1,
            scale: 1.0,
            generation: 0,
            width: 4,
            height: 2,
            pixels: Arc::new(vec![255; 4 * 2 * 4]),
        };
        let png = surface.to_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 2));
    }

    #[test]
    fn test_png_rejects_short_buffer() {
        let surface = Surface {
            page: 1,
            scale: 1.0,
            generation: 0,
            width: 4,
            height: 4,
            pixels: Arc::new(vec![0; 3]),
        };
        assert!(matches!(surface.to_png(), Err(DocumentError::ImageError(_))));
    }
}
