//! Fetch types

use thiserror::Error;

use crate::document::is_pdf;

/// Bytes retrieved for one candidate
#[derive(Debug, Clone)]
pub struct FetchedContent {
    /// URL the bytes came from
    pub url: String,
    /// Declared content type, if any
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedContent {
    /// Accept the body as a document candidate.
    ///
    /// Bytes with a PDF signature are always accepted. Otherwise the declared
    /// content type decides: a PDF type goes on to the decoder (which reports
    /// corrupt content), anything else means this candidate served the wrong
    /// thing, typically an HTML page, and the chain should advance.
    pub fn ensure_document(self) -> Result<Self, FetchError> {
        if is_pdf(&self.bytes) {
            return Ok(self);
        }
        match self.content_type.as_deref() {
            Some(ct) if is_document_type(ct) => Ok(self),
            other => Err(FetchError::CandidateFailed {
                url: self.url,
                reason: FailureReason::UnexpectedContentType(
                    other.unwrap_or("unknown").to_string(),
                ),
            }),
        }
    }
}

/// Outcome of a lightweight metadata check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: u16,
    pub content_type: Option<String>,
}

impl ProbeResult {
    /// Whether the declared content type is a PDF
    pub fn is_document(&self) -> bool {
        self.content_type
            .as_deref()
            .map(is_document_type)
            .unwrap_or(false)
    }
}

/// Content type check that ignores parameters and case
pub fn is_document_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    matches!(essence.as_str(), "application/pdf" | "application/x-pdf")
}

/// Why a candidate failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Non-2xx status other than 401
    Status(u16),
    /// Connection, DNS, TLS or body read failure
    Network(String),
    /// 2xx, but not a document
    UnexpectedContentType(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Status(code) => write!(f, "HTTP {}", code),
            FailureReason::Network(msg) => write!(f, "network error: {}", msg),
            FailureReason::UnexpectedContentType(ct) => write!(f, "unexpected content type {}", ct),
        }
    }
}

/// Fetch error type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// HTTP 401. Never retried on the same candidate and never treated as
    /// "try the next one": only re-authentication fixes it.
    #[error("Unauthorized: {url}")]
    Unauthorized { url: String },

    /// This candidate failed; the chain may advance
    #[error("Candidate {url} failed: {reason}")]
    CandidateFailed { url: String, reason: FailureReason },

    /// Bounded wait exceeded
    #[error("Request to {url} timed out after {millis} ms")]
    Timeout { url: String, millis: u64 },
}

impl FetchError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Unauthorized { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Unauthorized { url }
            | FetchError::CandidateFailed { url, .. }
            | FetchError::Timeout { url, .. } => url,
        }
    }
}
