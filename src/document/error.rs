//! Document error types
//!
//! Errors raised while decoding fetched bytes or rasterizing a page.

use thiserror::Error;

/// Decode and raster error type
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Bytes are not a document this engine can decode
    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    /// Page number outside `1..=total_pages`
    #[error("Page {page} out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Failed to rasterize a page
    #[error("Render error: {0}")]
    RenderError(String),

    /// The decoded handle was released while a raster was queued
    #[error("Document handle released")]
    Released,

    /// MuPDF context error
    #[error("MuPDF context error: {0}")]
    ContextError(String),

    /// Operation exceeded its bounded wait
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    /// Image processing error
    #[error("Image error: {0}")]
    ImageError(String),
}

/// Result type alias for document operations
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

#[cfg(feature = "mupdf")]
impl From<mupdf::Error> for DocumentError {
    fn from(err: mupdf::Error) -> Self {
        DocumentError::ContextError(err.to_string())
    }
}

impl From<image::ImageError> for DocumentError {
    fn from(err: image::ImageError) -> Self {
        DocumentError::ImageError(err.to_string())
    }
}
