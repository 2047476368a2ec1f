//! Authenticated content fetcher
//!
//! Retrieves bytes (or just metadata) for one candidate URL. A fetcher has
//! no side effects beyond the network call: it never touches session state
//! and never decides which candidate comes next.

mod http;
mod types;

use async_trait::async_trait;

pub use http::HttpFetcher;
pub use types::{is_document_type, FailureReason, FetchError, FetchedContent, ProbeResult};

/// Fetches candidate URLs with an optional bearer credential
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Retrieve the full body of `url`
    async fn fetch(&self, url: &str, token: Option<&str>) -> Result<FetchedContent, FetchError>;

    /// Lightweight existence/metadata check
    async fn probe(&self, url: &str, token: Option<&str>) -> Result<ProbeResult, FetchError>;
}
