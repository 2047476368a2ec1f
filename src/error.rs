//! Error types for the viewer engine and its HTTP host

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::directory::DirectoryError;
use crate::document::DocumentError;

/// Viewer error type
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ViewerError {
    /// One candidate failed; absorbed by advancing the chain
    #[error("Candidate unreachable: {url} ({reason})")]
    CandidateUnreachable { url: String, reason: String },

    /// HTTP 401; only re-authentication fixes it
    #[error("Not authorized to open {url}. Log in again and reopen the document.")]
    Unauthorized { url: String },

    /// Fetched bytes could not be decoded
    #[error("The document could not be displayed: {0}")]
    UnsupportedContent(String),

    /// Raster failed for one page; retried once, then the strategy falls back
    #[error("Failed to render page {page}: {message}")]
    RenderFailure { page: usize, message: String },

    /// Every candidate failed
    #[error("The document could not be loaded from any of {attempted} locations")]
    ChainExhausted { attempted: usize },

    #[error("No document is ready")]
    NotReady,

    #[error("Document is already loading: {0}")]
    LoadInProgress(String),

    #[error("No document to open")]
    NothingToOpen,
}

impl ViewerError {
    /// Whether this error is shown to the user (the rest are handled internally)
    pub fn surfaces_to_ui(&self) -> bool {
        matches!(
            self,
            ViewerError::Unauthorized { .. }
                | ViewerError::UnsupportedContent(_)
                | ViewerError::ChainExhausted { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ViewerError::CandidateUnreachable { .. } => "candidate_unreachable",
            ViewerError::Unauthorized { .. } => "unauthorized",
            ViewerError::UnsupportedContent(_) => "unsupported_content",
            ViewerError::RenderFailure { .. } => "render_failure",
            ViewerError::ChainExhausted { .. } => "chain_exhausted",
            ViewerError::NotReady => "not_ready",
            ViewerError::LoadInProgress(_) => "load_in_progress",
            ViewerError::NothingToOpen => "nothing_to_open",
        }
    }

    /// User-facing report with the "open in new window" target attached
    pub fn report(&self, external_url: Option<String>) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            external_url,
        }
    }
}

impl From<DocumentError> for ViewerError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::RenderError(message) => ViewerError::RenderFailure { page: 0, message },
            DocumentError::PageOutOfRange { page, total } => ViewerError::RenderFailure {
                page,
                message: format!("document has {} pages", total),
            },
            other => ViewerError::UnsupportedContent(other.to_string()),
        }
    }
}

/// Terminal error as presented to the UI shell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
    /// Always offered: opens the document outside the engine
    pub external_url: Option<String>,
}

/// HTTP host error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Viewer error: {0}")]
    Viewer(#[from] ViewerError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Viewer(e) => {
                let status = match e {
                    ViewerError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
                    ViewerError::NotReady => StatusCode::CONFLICT,
                    ViewerError::LoadInProgress(_) => StatusCode::CONFLICT,
                    ViewerError::NothingToOpen => StatusCode::NOT_FOUND,
                    ViewerError::ChainExhausted { .. } => StatusCode::BAD_GATEWAY,
                    ViewerError::CandidateUnreachable { .. } => StatusCode::BAD_GATEWAY,
                    ViewerError::UnsupportedContent(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    ViewerError::RenderFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind(), e.to_string())
            }
            AppError::Directory(e) => {
                tracing::warn!("Directory error: {}", e);
                match e {
                    DirectoryError::NotFound(what) => {
                        (StatusCode::NOT_FOUND, "not_found", format!("Not found: {}", what))
                    }
                    DirectoryError::Unauthorized => (
                        StatusCode::UNAUTHORIZED,
                        "unauthorized",
                        "Not authorized".to_string(),
                    ),
                    _ => (
                        StatusCode::BAD_GATEWAY,
                        "directory_error",
                        "Directory service error".to_string(),
                    ),
                }
            }
            AppError::Document(e) => {
                tracing::error!("Document error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "document_error",
                    "Failed to encode page".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
