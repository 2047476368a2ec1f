//! PDF Viewing Engine
//!
//! Resolves a document reference to fetchable content, fetches it with the
//! caller's credentials, decodes it and presents it page by page, falling back
//! to native or iframe embedding when rasterizing is not possible.
//!
//! # Modules
//!
//! - `resolve`: Ordered candidate URLs for a document reference
//! - `fetch`: Authenticated content fetcher
//! - `document`: Decoder seam and exclusive ownership of decoded documents
//! - `raster`: Page rasterizer and surface cache
//! - `session`: Per-document state machine
//! - `strategy`: Presentation fallbacks (raster, native embed, iframe)
//! - `viewer`: Public facade driven by the UI shell
//! - `directory`: Folder listings with a short-TTL cache
//! - `routes`: HTTP host for the browser UI shell

pub mod config;
pub mod credentials;
pub mod directory;
pub mod document;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod navigation;
pub mod raster;
pub mod resolve;
pub mod routes;
pub mod session;
pub mod state;
pub mod strategy;
pub mod viewer;

// MuPDF bindings used by the PDF decoder
#[cfg(feature = "mupdf")]
mod mupdf;

#[cfg(test)]
pub(crate) mod testing;
