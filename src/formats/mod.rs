//! Format-specific decoder implementations
//!
//! Each format module implements the `document` traits on top of an external
//! decoding library. Without the `mupdf` feature no decoder is available and
//! every document falls through to the embed strategies.

#[cfg(feature = "mupdf")]
pub mod pdf;

use async_trait::async_trait;

use crate::document::{DecodedHandle, DocumentDecoder, DocumentError, DocumentResult};

/// Decoder used when the crate is built without a decoding backend
#[derive(Debug, Default, Clone)]
pub struct NoDecoder;

#[async_trait]
impl DocumentDecoder for NoDecoder {
    async fn decode(&self, _bytes: Vec<u8>, name: &str) -> DocumentResult<DecodedHandle> {
        Err(DocumentError::UnsupportedContent(format!(
            "no decoder available for {}",
            name
        )))
    }
}

/// The decoder this build ships with
pub fn default_decoder(decode_timeout_secs: u64) -> std::sync::Arc<dyn DocumentDecoder> {
    #[cfg(feature = "mupdf")]
    {
        std::sync::Arc::new(pdf::MupdfDecoder::with_timeout(decode_timeout_secs))
    }
    #[cfg(not(feature = "mupdf"))]
    {
        let _ = decode_timeout_secs;
        std::sync::Arc::new(NoDecoder)
    }
}
