//! Session state types

use serde::Serialize;

use crate::document::{DocumentReference, PageLease};
use crate::error::{ErrorReport, ViewerError};
use crate::resolve::CandidateKind;
use crate::strategy::RenderStrategy;

/// Load progress of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    Resolving,
    Fetching,
    Decoding,
    Ready,
    Error,
}

impl LoadState {
    /// Whether a load task is working on this session
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            LoadState::Resolving | LoadState::Fetching | LoadState::Decoding
        )
    }
}

/// One candidate that failed and was absorbed by chain advancement
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEvent {
    pub url: String,
    pub kind: CandidateKind,
    /// Always [`ViewerError::CandidateUnreachable`]
    pub error: ViewerError,
}

/// Where the current content came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedInfo {
    pub url: String,
    pub kind: CandidateKind,
    pub content_type: Option<String>,
    pub bytes: usize,
}

/// Metadata of the surface currently on screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayedSurface {
    pub page: usize,
    pub scale: f32,
    pub generation: u64,
    pub width: u32,
    pub height: u32,
}

/// Snapshot published to observers on every change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub load_state: LoadState,
    pub current_page: usize,
    pub total_pages: usize,
    pub scale: f32,
    pub generation: u64,
    pub strategy: RenderStrategy,
    pub document: Option<DocumentReference>,
    pub resolved: Option<ResolvedInfo>,
    /// Location handed to the embed strategies
    pub embed_url: Option<String>,
    pub displayed: Option<DisplayedSurface>,
    pub failed_candidates: usize,
    pub error: Option<ErrorReport>,
}

impl ViewState {
    /// Snapshot of a session with nothing open
    pub fn idle(scale: f32) -> Self {
        Self {
            load_state: LoadState::Idle,
            current_page: 0,
            total_pages: 0,
            scale,
            generation: 0,
            strategy: RenderStrategy::CanvasRaster,
            document: None,
            resolved: None,
            embed_url: None,
            displayed: None,
            failed_candidates: 0,
            error: None,
        }
    }
}

/// Raster work issued by the session for the current generation
#[derive(Clone)]
pub struct RenderRequest {
    pub epoch: u64,
    pub generation: u64,
    pub page: usize,
    pub scale: f32,
    pub lease: PageLease,
}

impl std::fmt::Debug for RenderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderRequest")
            .field("epoch", &self.epoch)
            .field("generation", &self.generation)
            .field("page", &self.page)
            .field("scale", &self.scale)
            .finish()
    }
}
