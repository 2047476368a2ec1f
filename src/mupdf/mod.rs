//! Low-level MuPDF wrapper
//!
//! MuPDF's `fz_context` is **NOT thread-safe**. [`SafeDocument`] keeps the
//! bytes and opens a fresh document per operation behind a mutex, so the
//! decoded handle can be shared with blocking raster tasks.

mod safe;

pub use safe::SafeDocument;
