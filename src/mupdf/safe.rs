//! Thread-safe document wrapper for MuPDF
//!
//! # Design
//!
//! MuPDF documents are not thread-safe. This wrapper:
//!
//! 1. Stores the fetched document bytes
//! 2. Opens a fresh document for each operation
//! 3. Uses `parking_lot::Mutex` to serialize access
//!
//! Page geometry is read once at construction so that size queries never
//! have to reopen the document.

use std::sync::Arc;

use mupdf::Document;
use parking_lot::Mutex;

use crate::document::{is_pdf, DocumentError, DocumentResult, PageSize};

const PDF_MIME: &str = "application/pdf";

/// Thread-safe MuPDF document
pub struct SafeDocument {
    /// Fetched bytes
    data: Arc<Vec<u8>>,
    /// Name used in logs
    name: String,
    /// Intrinsic page sizes, in page order
    page_sizes: Vec<PageSize>,
    /// Mutex for serializing access
    _lock: Mutex<()>,
}

// SAFETY: every field except `_lock` is immutable owned data after
// construction. MuPDF objects never outlive a `with_doc` call: each call opens
// a fresh document while holding `_lock` and drops it before returning.
unsafe impl Send for SafeDocument {}
unsafe impl Sync for SafeDocument {}

impl SafeDocument {
    /// Validate and open a PDF from bytes
    pub fn from_bytes(data: Vec<u8>, name: String) -> DocumentResult<Self> {
        if !is_pdf(&data) {
            return Err(DocumentError::UnsupportedContent(format!(
                "{} is not a PDF (missing %PDF header)",
                name
            )));
        }

        let doc = Document::from_bytes(&data, PDF_MIME)
            .map_err(|e| DocumentError::UnsupportedContent(e.to_string()))?;
        let count = doc
            .page_count()
            .map_err(|e| DocumentError::UnsupportedContent(e.to_string()))?;
        if count <= 0 {
            return Err(DocumentError::UnsupportedContent(format!(
                "{} has no pages",
                name
            )));
        }

        let mut page_sizes = Vec::with_capacity(count as usize);
        for index in 0..count {
            let page = doc.load_page(index)?;
            let bounds = page.bounds()?;
            page_sizes.push(PageSize::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0));
        }

        Ok(Self {
            data: Arc::new(data),
            name,
            page_sizes,
            _lock: Mutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_count(&self) -> usize {
        self.page_sizes.len()
    }

    pub fn page_size(&self, index: usize) -> DocumentResult<PageSize> {
        self.page_sizes
            .get(index)
            .copied()
            .ok_or(DocumentError::PageOutOfRange {
                page: index + 1,
                total: self.page_sizes.len(),
            })
    }

    /// Execute a closure with access to a freshly opened document.
    /// Access is serialized via mutex.
    pub fn with_doc<F, R>(&self, f: F) -> DocumentResult<R>
    where
        F: FnOnce(&Document) -> DocumentResult<R>,
    {
        let _guard = self._lock.lock();
        let doc = Document::from_bytes(&self.data, PDF_MIME)?;
        f(&doc)
    }
}
