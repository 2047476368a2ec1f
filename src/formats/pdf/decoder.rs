//! PDF decoder backed by MuPDF
//!
//! Implements [`DocumentDecoder`] and [`DecodedDocument`] for PDF bytes.
//! Parsing is CPU-bound and runs on the blocking pool with a timeout.

use async_trait::async_trait;
use mupdf::{Colorspace, Matrix};
use tokio::time::{timeout, Duration};

use crate::document::{
    DecodedDocument, DecodedHandle, DocumentDecoder, DocumentError, DocumentResult, PageSize,
};
use crate::mupdf::SafeDocument;

/// Timeout for decoding a fetched document
const DECODE_TIMEOUT_SECS: u64 = 30;

/// MuPDF-backed decoder
#[derive(Debug, Clone)]
pub struct MupdfDecoder {
    timeout_secs: u64,
}

impl Default for MupdfDecoder {
    fn default() -> Self {
        Self {
            timeout_secs: DECODE_TIMEOUT_SECS,
        }
    }
}

impl MupdfDecoder {
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl DocumentDecoder for MupdfDecoder {
    async fn decode(&self, bytes: Vec<u8>, name: &str) -> DocumentResult<DecodedHandle> {
        let name = name.to_string();
        let size = bytes.len();

        // Some PDFs make MuPDF spin for a long time. The blocking thread may
        // keep running after the timeout, but the session gets its answer.
        let decoded = timeout(
            Duration::from_secs(self.timeout_secs),
            tokio::task::spawn_blocking(move || SafeDocument::from_bytes(bytes, name)),
        )
        .await
        .map_err(|_| DocumentError::Timeout(self.timeout_secs))?
        .map_err(|e| DocumentError::RenderError(format!("Task join error: {}", e)))??;

        tracing::debug!(
            name = %decoded.name(),
            pages = decoded.page_count(),
            bytes = size,
            "Decoded PDF"
        );

        Ok(DecodedHandle::new(MupdfDocument { doc: decoded }))
    }
}

/// Decoded PDF
pub struct MupdfDocument {
    doc: SafeDocument,
}

impl DecodedDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.doc.page_count()
    }

    fn page_size(&self, index: usize) -> DocumentResult<PageSize> {
        self.doc.page_size(index)
    }

    fn draw_page(&self, index: usize, width: u32, height: u32) -> DocumentResult<Vec<u8>> {
        let size = self.doc.page_size(index)?;

        // Independent axis factors land the pixmap on the exact target size
        let sx = width as f32 / size.width;
        let sy = height as f32 / size.height;

        self.doc.with_doc(|mupdf_doc| {
            let page = mupdf_doc.load_page(index as i32)?;
            let matrix = Matrix::new_scale(sx, sy);
            let colorspace = Colorspace::device_rgb();
            let pixmap = page.to_pixmap(&matrix, &colorspace, true, true)?;

            Ok(pixmap_to_rgba(&pixmap, width, height))
        })
    }
}

/// Copy a pixmap into an RGBA buffer of exactly `width x height`.
///
/// MuPDF rounds the pixmap bounds outward, so it can be one pixel larger than
/// the requested raster; excess is cropped and any shortfall stays white.
fn pixmap_to_rgba(pixmap: &mupdf::Pixmap, width: u32, height: u32) -> Vec<u8> {
    let src_w = pixmap.width() as usize;
    let src_h = pixmap.height() as usize;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgba = vec![255u8; (width as usize) * (height as usize) * 4];

    for y in 0..(height as usize).min(src_h) {
        for x in 0..(width as usize).min(src_w) {
            let offset = (y * src_w + x) * n;
            let r = samples.get(offset).copied().unwrap_or(255);
            let g = samples.get(offset + 1).copied().unwrap_or(255);
            let b = samples.get(offset + 2).copied().unwrap_or(255);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            let dst = (y * width as usize + x) * 4;
            rgba[dst..dst + 4].copy_from_slice(&[r, g, b, a]);
        }
    }

    rgba
}
