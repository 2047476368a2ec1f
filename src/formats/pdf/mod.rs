//! PDF format implementation
//!
//! [`MupdfDecoder`] turns fetched bytes into a [`DecodedHandle`] whose pages
//! are drawn through [`SafeDocument`] for thread-safe access.
//!
//! [`DecodedHandle`]: crate::document::DecodedHandle
//! [`SafeDocument`]: crate::mupdf::SafeDocument

mod decoder;

pub use decoder::{MupdfDecoder, MupdfDocument};
