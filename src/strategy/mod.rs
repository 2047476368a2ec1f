//! Render strategy selector
//!
//! Presentation falls down a fixed chain:
//!
//! ```text
//! CanvasRaster ──(raster error / no decode)──► NativeEmbed ──(no load signal)──► IframeEmbed
//! ```
//!
//! `IframeEmbed` is terminal. Whatever the strategy, the "open in new window"
//! action stays available since some hosts disallow embedding entirely.

mod embed;

use serde::Serialize;

pub use embed::{wait_for_native_load, EmbedError, EmbedHost, HeadlessEmbedHost, ShellEmbedHost};

/// How the current document is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// Pages rasterized by the engine
    #[default]
    CanvasRaster,
    /// Resolved URL handed to a platform-native document renderer
    NativeEmbed,
    /// Resolved URL in an iframe
    IframeEmbed,
}

impl RenderStrategy {
    /// Next strategy down the chain
    pub fn fallback(self) -> Option<Self> {
        match self {
            RenderStrategy::CanvasRaster => Some(RenderStrategy::NativeEmbed),
            RenderStrategy::NativeEmbed => Some(RenderStrategy::IframeEmbed),
            RenderStrategy::IframeEmbed => None,
        }
    }

    /// Whether the engine draws pages itself
    pub fn is_raster(self) -> bool {
        self == RenderStrategy::CanvasRaster
    }
}

/// Why the selector left a strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FallbackReason {
    /// Rasterization failed after its retry
    RenderFailed(String),
    /// Content was reached but could not be decoded
    DecodeUnavailable(String),
    /// The native embed did not signal load within the bounded wait
    EmbedTimeout,
    /// The native embed reported an error
    EmbedFailed(String),
}

/// One recorded fallback step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackStep {
    pub from: RenderStrategy,
    pub to: RenderStrategy,
    pub reason: FallbackReason,
}

/// Tracks the active strategy of one session
#[derive(Debug, Clone, Default)]
pub struct StrategySelector {
    current: RenderStrategy,
    history: Vec<FallbackStep>,
}

impl StrategySelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> RenderStrategy {
        self.current
    }

    pub fn history(&self) -> &[FallbackStep] {
        &self.history
    }

    /// Move one step down the chain. Returns the new strategy, or `None` when
    /// already at the terminal one.
    pub fn fall_back(&mut self, reason: FallbackReason) -> Option<RenderStrategy> {
        let next = self.current.fallback()?;
        tracing::warn!(from = ?self.current, to = ?next, ?reason, "Render strategy fallback");
        self.history.push(FallbackStep {
            from: self.current,
            to: next,
            reason,
        });
        self.current = next;
        Some(next)
    }

    /// Back to `CanvasRaster` for a new document
    pub fn reset(&mut self) {
        self.current = RenderStrategy::CanvasRaster;
        self.history.clear();
    }
}
