//! Document traits
//!
//! Decoding is delegated to an external library behind [`DocumentDecoder`];
//! the decoded result is owned by exactly one session through
//! [`DecodedHandle`].

use std::sync::{Arc, Weak};

use async_trait::async_trait;

use super::error::{DocumentError, DocumentResult};
use super::types::PageSize;

/// Decodes fetched bytes into a page-addressable document
#[async_trait]
pub trait DocumentDecoder: Send + Sync {
    /// Decode `bytes`. `name` is only used for logging and diagnostics.
    async fn decode(&self, bytes: Vec<u8>, name: &str) -> DocumentResult<DecodedHandle>;
}

/// A decoded document.
///
/// Page indices are zero-based here; the session layer speaks one-based page
/// numbers. Methods may block and are called from `spawn_blocking`.
pub trait DecodedDocument: Send + Sync {
    /// Number of pages
    fn page_count(&self) -> usize;

    /// Intrinsic size of a page
    fn page_size(&self, index: usize) -> DocumentResult<PageSize>;

    /// Draw a page into an RGBA8 buffer of exactly `width * height * 4` bytes
    fn draw_page(&self, index: usize, width: u32, height: u32) -> DocumentResult<Vec<u8>>;
}

/// Exclusive owner of a decoded document.
///
/// Not `Clone`: the session holds it in an `Option` and releases it by
/// `take()`, so a second release has nothing to drop. Raster tasks only ever
/// see a [`PageLease`], which cannot keep the document alive past release
/// except for the duration of a draw already in progress.
pub struct DecodedHandle {
    inner: Arc<dyn DecodedDocument>,
    page_count: usize,
}

impl DecodedHandle {
    pub fn new(document: impl DecodedDocument + 'static) -> Self {
        let page_count = document.page_count();
        Self {
            inner: Arc::new(document),
            page_count,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn page_size(&self, index: usize) -> DocumentResult<PageSize> {
        self.inner.page_size(index)
    }

    /// Non-owning access for a raster task
    pub fn lease(&self) -> PageLease {
        PageLease {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Release the document. Consumes the handle, so it can only happen once.
    pub fn release(self) {
        tracing::debug!(pages = self.page_count, "Releasing decoded document");
        drop(self);
    }
}

impl std::fmt::Debug for DecodedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedHandle")
            .field("page_count", &self.page_count)
            .finish()
    }
}

/// Weak access to a decoded document held by a raster task
#[derive(Clone)]
pub struct PageLease {
    inner: Weak<dyn DecodedDocument>,
}

impl PageLease {
    /// Upgrade for the duration of one draw. Fails once the owner released it.
    pub fn acquire(&self) -> DocumentResult<Arc<dyn DecodedDocument>> {
        self.inner.upgrade().ok_or(DocumentError::Released)
    }

    /// Whether the owning session still holds the document
    pub fn is_live(&self) -> bool {
        self.inner.strong_count() > 0
    }
}
