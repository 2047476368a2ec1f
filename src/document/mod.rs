//! Document abstraction
//!
//! Format-agnostic interfaces between the viewer engine and the external
//! decoding library.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐      bytes       ┌──────────────────────┐
//! │   DocumentSession    │ ───────────────► │   DocumentDecoder    │
//! │ (owns DecodedHandle) │ ◄─────────────── │  (MuPDF, or fakes)   │
//! └──────────────────────┘  DecodedHandle   └──────────────────────┘
//!            │ lease()
//!            ▼
//! ┌──────────────────────┐
//! │    PageRasterizer    │  Weak access only; fails once released
//! └──────────────────────┘
//! ```

mod error;
mod traits;
mod types;

pub use error::{DocumentError, DocumentResult};
pub use traits::{DecodedDocument, DecodedHandle, DocumentDecoder, PageLease};
pub use types::{is_pdf, DocumentReference, PageSize, ReferenceTarget};
