//! Page rasterizer
//!
//! Draws one page of a decoded document at a requested scale. The rasterizer
//! never touches session state: it only returns a [`Surface`] tagged with the
//! generation it was asked for, and the caller decides whether the result is
//! still wanted.

mod cache;
mod surface;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use crate::document::{DocumentError, DocumentResult, PageLease};

pub use cache::{SurfaceCache, SurfaceKey};
pub use surface::Surface;

/// Timeout for rendering operations
const RENDER_TIMEOUT_SECS: u64 = 30;

/// Renders pages of a decoded document
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render one-based `page` at `scale`.
    ///
    /// Output dimensions are `PageSize::scaled(scale)` of the page.
    async fn render(
        &self,
        lease: &PageLease,
        page: usize,
        scale: f32,
        generation: u64,
    ) -> DocumentResult<Surface>;
}

/// Rasterizer running draws on the blocking pool
#[derive(Debug, Clone)]
pub struct Rasterizer {
    timeout: Duration,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::with_timeout(RENDER_TIMEOUT_SECS)
    }
}

impl Rasterizer {
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl PageRasterizer for Rasterizer {
    async fn render(
        &self,
        lease: &PageLease,
        page: usize,
        scale: f32,
        generation: u64,
    ) -> DocumentResult<Surface> {
        let document = lease.acquire()?;
        let total = document.page_count();
        if page == 0 || page > total {
            return Err(DocumentError::PageOutOfRange { page, total });
        }

        let index = page - 1;
        let (width, height) = document.page_size(index)?.scaled(scale);

        let task = tokio::task::spawn_blocking(move || document.draw_page(index, width, height));
        let pixels = match timeout(self.timeout, task).await {
            Ok(joined) => joined
                .map_err(|e| DocumentError::RenderError(format!("Task join error: {}", e)))??,
            Err(_) => return Err(DocumentError::Timeout(self.timeout.as_secs())),
        };

        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(DocumentError::RenderError(format!(
                "page {} produced {} bytes, expected {}",
                page,
                pixels.len(),
                expected
            )));
        }

        tracing::debug!(page, scale, generation, width, height, "Rendered page");

        Ok(Surface {
            page,
            scale,
            generation,
            width,
            height,
            pixels: std::sync::Arc::new(pixels),
        })
    }
}
