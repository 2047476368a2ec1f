//! Core document types
//!
//! Immutable references to documents and the page geometry reported by a
//! decoded document.

use serde::{Deserialize, Serialize};

/// What a [`DocumentReference`] points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum ReferenceTarget {
    /// Raw URL, absolute or relative to the API origin
    Url(String),
    /// Directory entry id, served through the authenticated proxy endpoint
    Entry(String),
}

/// Logical pointer to a document plus the name shown to the user.
///
/// Created when the user selects a document and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    target: ReferenceTarget,
    display_name: String,
}

impl DocumentReference {
    /// Reference a document by URL
    pub fn from_url(url: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            target: ReferenceTarget::Url(url.into()),
            display_name: display_name.into(),
        }
    }

    /// Reference a document by its directory entry id
    pub fn from_entry(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            target: ReferenceTarget::Entry(id.into()),
            display_name: display_name.into(),
        }
    }

    pub fn target(&self) -> &ReferenceTarget {
        &self.target
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Stable key used to detect duplicate concurrent loads
    pub fn key(&self) -> String {
        match &self.target {
            ReferenceTarget::Url(url) => format!("url:{}", url),
            ReferenceTarget::Entry(id) => format!("entry:{}", id),
        }
    }

    /// File name for download actions, always ending in `.pdf`
    pub fn download_name(&self) -> String {
        let name = self.display_name.trim();
        let base = if name.is_empty() { "document" } else { name };
        if base.to_lowercase().ends_with(".pdf") {
            base.to_string()
        } else {
            format!("{}.pdf", base)
        }
    }
}

/// Intrinsic page size in document units (points)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pixel dimensions of this page rasterized at `scale`.
    ///
    /// Width and height go through the same rounding rule so the aspect ratio
    /// never drifts by more than half a pixel. Never returns a zero dimension.
    pub fn scaled(&self, scale: f32) -> (u32, u32) {
        let round = |v: f32| -> u32 {
            let px = (v * scale).round();
            if px.is_finite() && px >= 1.0 {
                px as u32
            } else {
                1
            }
        };
        (round(self.width), round(self.height))
    }
}

/// PDF magic check
pub fn is_pdf(bytes: &[u8]) -> bool {
    // Some producers emit a BOM or whitespace before the header
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}
