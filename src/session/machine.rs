//! Document session state machine
//!
//! ```text
//!            open                 candidate              bytes
//!   Idle ─────────► Resolving ─────────────► Fetching ──────────► Decoding
//!                      ▲                        │                    │
//!                      └──── candidate failed ──┘                    │ decoded
//!                                               │ exhausted / 401    ▼
//!                                               └──────► Error ◄── Ready ⟲ page/zoom
//! ```
//!
//! Transitions are synchronous. Async work (fetch, decode, raster) runs
//! outside the session and reports back tagged with the epoch it started
//! under; reports from an older epoch are ignored. Raster results are
//! additionally tagged with the render generation and only drawn when it is
//! still current.

use crate::document::{DecodedHandle, DocumentError, DocumentReference};
use crate::error::ViewerError;
use crate::fetch::{FetchError, FetchedContent};
use crate::navigation::{self, ScaleBounds};
use crate::raster::{Surface, SurfaceCache};
use crate::resolve::{Candidate, CandidateKind, ResolutionChain};
use crate::strategy::{FallbackReason, RenderStrategy, StrategySelector};

use super::blob::LocalBlob;
use super::state::{
    CandidateEvent, DisplayedSurface, LoadState, RenderRequest, ResolvedInfo, ViewState,
};

struct Resolved {
    info: ResolvedInfo,
    /// Where embeds and external opens point; `None` when a blob could not
    /// be written out
    location: Option<String>,
    /// Keeps the spilled file alive
    _blob: Option<LocalBlob>,
}

/// Runtime state of one open document.
///
/// Owns the [`DecodedHandle`] exclusively; it is released on close, on
/// opening another reference, on retry and when the session is dropped.
pub struct DocumentSession {
    reference: Option<DocumentReference>,
    nominal_url: Option<String>,
    chain: Option<ResolutionChain>,
    resolved: Option<Resolved>,
    load_state: LoadState,
    handle: Option<DecodedHandle>,
    total_pages: usize,
    current_page: usize,
    scale: f32,
    bounds: ScaleBounds,
    generation: u64,
    epoch: u64,
    events: Vec<CandidateEvent>,
    error: Option<ViewerError>,
    strategy: StrategySelector,
    displayed: Option<Surface>,
    surfaces: SurfaceCache,
}

impl DocumentSession {
    pub fn new(bounds: ScaleBounds, surface_cache_size: usize) -> Self {
        Self {
            reference: None,
            nominal_url: None,
            chain: None,
            resolved: None,
            load_state: LoadState::Idle,
            handle: None,
            total_pages: 0,
            current_page: 0,
            scale: bounds.default,
            bounds,
            generation: 0,
            epoch: 0,
            events: Vec::new(),
            error: None,
            strategy: StrategySelector::new(),
            displayed: None,
            surfaces: SurfaceCache::new(surface_cache_size),
        }
    }

    // Accessors

    pub fn reference(&self) -> Option<&DocumentReference> {
        self.reference.as_ref()
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn bounds(&self) -> &ScaleBounds {
        &self.bounds
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Candidate failures absorbed during the current load
    pub fn events(&self) -> &[CandidateEvent] {
        &self.events
    }

    pub fn error(&self) -> Option<&ViewerError> {
        self.error.as_ref()
    }

    pub fn strategy(&self) -> RenderStrategy {
        self.strategy.current()
    }

    pub fn selector(&self) -> &StrategySelector {
        &self.strategy
    }

    pub fn displayed(&self) -> Option<&Surface> {
        self.displayed.as_ref()
    }

    pub fn resolved_url(&self) -> Option<&str> {
        self.resolved.as_ref().map(|r| r.info.url.as_str())
    }

    pub fn has_document(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
    }

    fn bump_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Drop the decoded document and everything derived from it
    fn release_document(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.release();
        }
        self.resolved = None;
        self.displayed = None;
        self.surfaces.clear();
        self.total_pages = 0;
        self.current_page = 0;
    }

    // Load lifecycle

    /// `Idle`/any → `Resolving` for the chain's reference. Returns the new epoch.
    pub fn begin_open(&mut self, chain: ResolutionChain) -> u64 {
        self.release_document();

        self.reference = Some(chain.reference().clone());
        self.nominal_url = Some(chain.nominal_url().to_string());
        self.chain = Some(chain);
        self.load_state = LoadState::Resolving;
        self.scale = self.bounds.default;
        self.events.clear();
        self.error = None;
        self.strategy.reset();
        self.bump_generation();
        let epoch = self.bump_epoch();

        tracing::debug!(epoch, url = ?self.nominal_url, "Session resolving");
        epoch
    }

    /// `Error` → `Resolving`, continuing with the next untried candidate.
    /// Returns the new epoch, or `None` when there is nothing to retry.
    pub fn retry(&mut self) -> Option<u64> {
        if self.load_state != LoadState::Error || self.chain.is_none() {
            return None;
        }

        self.release_document();
        self.load_state = LoadState::Resolving;
        self.error = None;
        self.strategy.reset();
        self.bump_generation();
        let epoch = self.bump_epoch();

        tracing::debug!(epoch, "Session retrying from next candidate");
        Some(epoch)
    }

    /// Any → `Idle`, releasing the decoded document
    pub fn close(&mut self) {
        self.release_document();
        self.reference = None;
        self.nominal_url = None;
        self.chain = None;
        self.load_state = LoadState::Idle;
        self.scale = self.bounds.default;
        self.events.clear();
        self.error = None;
        self.strategy.reset();
        self.bump_generation();
        self.bump_epoch();

        tracing::debug!(epoch = self.epoch, "Session closed");
    }

    /// Lend the chain to a load task
    pub fn take_chain(&mut self, epoch: u64) -> Option<ResolutionChain> {
        if !self.is_current(epoch) {
            return None;
        }
        self.chain.take()
    }

    /// Give the chain back so `retry` can continue from where it stopped
    pub fn restore_chain(&mut self, epoch: u64, chain: ResolutionChain) {
        if self.is_current(epoch) {
            self.chain = Some(chain);
        }
    }

    /// `Resolving` → `Fetching`
    pub fn candidate_selected(&mut self, epoch: u64, candidate: &Candidate) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        self.load_state = LoadState::Fetching;
        tracing::debug!(epoch, url = %candidate.url, kind = ?candidate.kind, "Fetching candidate");
        true
    }

    /// `Fetching` → `Resolving`, recording a `CandidateUnreachable` event
    pub fn candidate_failed(&mut self, epoch: u64, candidate: &Candidate, err: &FetchError) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        tracing::warn!(
            epoch,
            url = %candidate.url,
            kind = ?candidate.kind,
            error = %err,
            "Candidate unreachable, advancing"
        );
        self.events.push(CandidateEvent {
            url: candidate.url.clone(),
            kind: candidate.kind,
            error: ViewerError::CandidateUnreachable {
                url: candidate.url.clone(),
                reason: err.to_string(),
            },
        });
        self.load_state = LoadState::Resolving;
        true
    }

    /// `Fetching` → `Error` on HTTP 401
    pub fn unauthorized(&mut self, epoch: u64, url: &str) -> bool {
        self.fail(epoch, ViewerError::Unauthorized { url: url.to_string() })
    }

    /// `Resolving` → `Error` once every candidate failed
    pub fn chain_exhausted(&mut self, epoch: u64, attempted: usize) -> bool {
        self.fail(epoch, ViewerError::ChainExhausted { attempted })
    }

    fn fail(&mut self, epoch: u64, error: ViewerError) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        tracing::error!(epoch, error = %error, "Document load failed");
        self.load_state = LoadState::Error;
        self.error = Some(error);
        true
    }

    /// `Fetching` → `Decoding`.
    ///
    /// `blob` is the spilled copy of binary-blob content, written by the
    /// caller before taking the session lock.
    pub fn fetched(
        &mut self,
        epoch: u64,
        candidate: &Candidate,
        content: &FetchedContent,
        blob: Option<LocalBlob>,
    ) -> bool {
        if !self.is_current(epoch) {
            return false;
        }

        let location = if candidate.kind == CandidateKind::BinaryBlob {
            blob.as_ref().map(|b| b.location().to_string())
        } else {
            Some(candidate.url.clone())
        };

        self.resolved = Some(Resolved {
            info: ResolvedInfo {
                url: candidate.url.clone(),
                kind: candidate.kind,
                content_type: content.content_type.clone(),
                bytes: content.bytes.len(),
            },
            location,
            _blob: blob,
        });
        self.load_state = LoadState::Decoding;
        tracing::debug!(epoch, url = %candidate.url, bytes = content.bytes.len(), "Decoding");
        true
    }

    /// `Decoding` → `Ready` at page 1. A stale handle is released at once.
    pub fn decoded(&mut self, epoch: u64, handle: DecodedHandle) -> Option<RenderRequest> {
        if !self.is_current(epoch) {
            tracing::debug!(epoch, current = self.epoch, "Discarding stale decode");
            handle.release();
            return None;
        }
        if handle.page_count() == 0 {
            handle.release();
            self.decode_failed(
                epoch,
                DocumentError::UnsupportedContent("document has no pages".to_string()),
            );
            return None;
        }

        self.total_pages = handle.page_count();
        self.current_page = 1;
        self.handle = Some(handle);
        self.load_state = LoadState::Ready;
        self.bump_generation();

        tracing::info!(
            epoch,
            pages = self.total_pages,
            url = ?self.resolved_url(),
            "Document ready"
        );
        self.render_request()
    }

    /// `Decoding` → `Error`. The content was reached, so presentation falls
    /// back to the native embed.
    pub fn decode_failed(&mut self, epoch: u64, err: DocumentError) -> bool {
        let message = err.to_string();
        if !self.fail(epoch, ViewerError::UnsupportedContent(message.clone())) {
            return false;
        }
        self.strategy
            .fall_back(FallbackReason::DecodeUnavailable(message));
        true
    }

    // Navigation

    /// Move to the next page; no-op at the last page
    pub fn next_page(&mut self) -> Option<RenderRequest> {
        self.ready()?;
        let page = navigation::next_page(self.current_page, self.total_pages)?;
        self.show_page(page)
    }

    /// Move to the previous page; no-op at page 1
    pub fn prev_page(&mut self) -> Option<RenderRequest> {
        self.ready()?;
        let page = navigation::prev_page(self.current_page)?;
        self.show_page(page)
    }

    /// Jump to `page`, clamped into range
    pub fn jump_to_page(&mut self, page: i64) -> Option<RenderRequest> {
        self.ready()?;
        let page = navigation::jump_to_page(self.current_page, page, self.total_pages)?;
        self.show_page(page)
    }

    pub fn zoom_in(&mut self) -> Option<RenderRequest> {
        let target = navigation::zoom_by(&self.bounds, self.scale, self.bounds.step)?;
        self.apply_scale(target)
    }

    pub fn zoom_out(&mut self) -> Option<RenderRequest> {
        let target = navigation::zoom_by(&self.bounds, self.scale, -self.bounds.step)?;
        self.apply_scale(target)
    }

    /// Relative zoom change, clamped
    pub fn zoom_by(&mut self, delta: f32) -> Option<RenderRequest> {
        let target = navigation::zoom_by(&self.bounds, self.scale, delta)?;
        self.apply_scale(target)
    }

    /// Absolute zoom, clamped
    pub fn set_zoom(&mut self, value: f32) -> Option<RenderRequest> {
        let target = navigation::set_zoom(&self.bounds, self.scale, value)?;
        self.apply_scale(target)
    }

    pub fn reset_zoom(&mut self) -> Option<RenderRequest> {
        let target = navigation::set_zoom(&self.bounds, self.scale, self.bounds.default)?;
        self.apply_scale(target)
    }

    fn ready(&self) -> Option<()> {
        (self.load_state == LoadState::Ready).then_some(())
    }

    fn show_page(&mut self, page: usize) -> Option<RenderRequest> {
        self.current_page = page;
        self.bump_generation();
        tracing::debug!(page, generation = self.generation, "Page changed");
        self.render_request()
    }

    /// Scale may be set before the document is ready; it only renders once
    /// the session is `Ready`
    fn apply_scale(&mut self, scale: f32) -> Option<RenderRequest> {
        self.scale = scale;
        if self.load_state != LoadState::Ready {
            return None;
        }
        self.bump_generation();
        tracing::debug!(scale, generation = self.generation, "Scale changed");
        self.render_request()
    }

    // Rendering

    /// Raster work for the current page, scale and generation.
    ///
    /// A surface already cached for this page and scale is published
    /// directly and no request is returned.
    pub fn render_request(&mut self) -> Option<RenderRequest> {
        if self.load_state != LoadState::Ready || !self.strategy.current().is_raster() {
            return None;
        }
        let lease = self.handle.as_ref()?.lease();

        if let Some(cached) = self.surfaces.get(self.current_page, self.scale) {
            tracing::debug!(
                page = self.current_page,
                scale = self.scale,
                generation = self.generation,
                "Serving cached surface"
            );
            self.displayed = Some(cached.for_generation(self.generation));
            return None;
        }

        Some(RenderRequest {
            epoch: self.epoch,
            generation: self.generation,
            page: self.current_page,
            scale: self.scale,
            lease,
        })
    }

    /// Draw a finished raster if its generation is still current.
    ///
    /// Stale results are cached (the pixels are still valid for their page and
    /// scale) but never displayed.
    pub fn apply_surface(&mut self, epoch: u64, surface: Surface) -> bool {
        if !self.is_current(epoch) {
            tracing::debug!(epoch, current = self.epoch, "Discarding raster for replaced document");
            return false;
        }

        self.surfaces.insert(surface.clone());
        if surface.generation != self.generation || self.load_state != LoadState::Ready {
            tracing::debug!(
                page = surface.page,
                scale = surface.scale,
                generation = surface.generation,
                current = self.generation,
                "Discarding stale raster"
            );
            return false;
        }

        self.displayed = Some(surface);
        true
    }

    /// A raster for the current generation failed after its retry. Falls back
    /// to the native embed; returns false when the failure was stale.
    pub fn render_failed(&mut self, request: &RenderRequest, err: &DocumentError) -> bool {
        if !self.is_current(request.epoch) || request.generation != self.generation {
            tracing::debug!(
                page = request.page,
                generation = request.generation,
                "Ignoring failure of stale raster"
            );
            return false;
        }

        let failure = ViewerError::RenderFailure {
            page: request.page,
            message: err.to_string(),
        };
        tracing::warn!(error = %failure, "Raster failed");
        self.displayed = None;
        self.strategy
            .fall_back(FallbackReason::RenderFailed(err.to_string()))
            .is_some()
    }

    /// The native embed did not load; falls back to the iframe
    pub fn embed_failed(&mut self, epoch: u64, reason: FallbackReason) -> bool {
        if !self.is_current(epoch) || self.strategy.current() != RenderStrategy::NativeEmbed {
            return false;
        }
        self.strategy.fall_back(reason).is_some()
    }

    // Presentation

    /// Location for the embed strategies, once content has been reached
    pub fn embed_url(&self) -> Option<String> {
        if self.strategy.current().is_raster() {
            return None;
        }
        self.resolved.as_ref().and_then(|r| r.location.clone())
    }

    /// "Open in new window" target: the resolved location, or the nominal URL
    /// when nothing resolved
    pub fn external_target(&self) -> Option<String> {
        self.resolved
            .as_ref()
            .and_then(|r| r.location.clone())
            .or_else(|| self.nominal_url.clone())
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            load_state: self.load_state,
            current_page: self.current_page,
            total_pages: self.total_pages,
            scale: self.scale,
            generation: self.generation,
            strategy: self.strategy.current(),
            document: self.reference.clone(),
            resolved: self.resolved.as_ref().map(|r| r.info.clone()),
            embed_url: self.embed_url(),
            displayed: self.displayed.as_ref().map(|s| DisplayedSurface {
                page: s.page,
                scale: s.scale,
                generation: s.generation,
                width: s.width,
                height: s.height,
            }),
            failed_candidates: self.events.len(),
            error: self
                .error
                .as_ref()
                .map(|e| e.report(self.external_target())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ApiConfig;
    use crate::resolve::ResolutionRules;
    use crate::testing::FakeDocument;

    fn session() -> DocumentSession {
        DocumentSession::new(ScaleBounds::default(), 8)
    }

    fn chain() -> ResolutionChain {
        let rules = Arc::new(ResolutionRules::from_config(&ApiConfig {
            base_url: "http://files.local/api".into(),
            ..ApiConfig::default()
        }));
        ResolutionChain::new(DocumentReference::from_url("/docs/a.pdf", "a.pdf"), rules)
    }

    fn candidate(kind: CandidateKind) -> Candidate {
        Candidate {
            url: "http://files.local/docs/a.pdf".into(),
            kind,
        }
    }

    fn content() -> FetchedContent {
        FetchedContent {
            url: "http://files.local/docs/a.pdf".into(),
            content_type: Some("application/pdf".into()),
            bytes: b"%PDF-1.4".to_vec(),
        }
    }

    /// Session walked to `Ready` with `pages` pages
    fn ready(pages: usize) -> (DocumentSession, u64) {
        let mut s = session();
        let epoch = s.begin_open(chain());
        let c = candidate(CandidateKind::Given);
        assert!(s.candidate_selected(epoch, &c));
        assert!(s.fetched(epoch, &c, &content(), None));
        s.decoded(epoch, DecodedHandle::new(FakeDocument::new(pages)));
        (s, epoch)
    }

    fn surface_for(req: &RenderRequest) -> Surface {
        Surface {
            page: req.page,
            scale: req.scale,
            generation: req.generation,
            width: 1,
            height: 1,
            pixels: Arc::new(vec![0; 4]),
        }
    }

    fn assert_ready_invariants(s: &DocumentSession) {
        assert_eq!(s.load_state(), LoadState::Ready);
        assert!(1 <= s.current_page() && s.current_page() <= s.total_pages());
        assert!((0.5..=3.0).contains(&s.scale()));
    }

    #[test]
    fn test_full_transition_path() {
        let mut s = session();
        assert_eq!(s.load_state(), LoadState::Idle);

        let epoch = s.begin_open(chain());
        assert_eq!(s.load_state(), LoadState::Resolving);

        let c = candidate(CandidateKind::Given);
        s.candidate_selected(epoch, &c);
        assert_eq!(s.load_state(), LoadState::Fetching);

        s.fetched(epoch, &c, &content(), None);
        assert_eq!(s.load_state(), LoadState::Decoding);

        let request = s
            .decoded(epoch, DecodedHandle::new(FakeDocument::new(3)))
            .unwrap();
        assert_ready_invariants(&s);
        assert_eq!(s.total_pages(), 3);
        assert_eq!(s.current_page(), 1);
        assert_eq!(s.scale(), 1.5);
        assert_eq!((request.page, request.scale), (1, 1.5));
        assert_eq!(request.generation, s.generation());
    }

    #[test]
    fn test_boundaries_are_no_ops() {
        let (mut s, _) = ready(2);
        let generation = s.generation();
        assert!(s.prev_page().is_none());
        assert_eq!(s.generation(), generation);

        assert!(s.next_page().is_some());
        let generation = s.generation();
        let before = s.view_state();
        assert!(s.next_page().is_none());
        assert_eq!(s.view_state(), before);
        assert_eq!(s.generation(), generation);
        assert_ready_invariants(&s);
    }

    #[test]
    fn test_navigation_requires_ready() {
        let mut s = session();
        s.begin_open(chain());
        assert!(s.next_page().is_none());
        assert!(s.jump_to_page(3).is_none());
        assert_eq!(s.current_page(), 0);

        // Zoom is remembered before the document is ready
        assert!(s.zoom_in().is_none());
        assert!((s.scale() - 1.7).abs() < 1e-5);
    }

    #[test]
    fn test_stale_surface_is_discarded() {
        let (mut s, epoch) = ready(3);
        let first = s.render_request().unwrap();
        let second = s.zoom_in().unwrap();

        assert!(!s.apply_surface(epoch, surface_for(&first)));
        assert!(s.displayed().is_none());
        assert!(s.apply_surface(epoch, surface_for(&second)));
        assert_eq!(s.displayed().unwrap().generation, second.generation);
    }

    #[test]
    fn test_cached_surface_served_without_request() {
        let (mut s, epoch) = ready(3);
        let first = s.render_request().unwrap();
        assert!(s.apply_surface(epoch, surface_for(&first)));

        s.next_page().unwrap();
        // Back to page 1 at the same scale: cached
        assert!(s.prev_page().is_none());
        let displayed = s.displayed().unwrap();
        assert_eq!(displayed.page, 1);
        assert_eq!(displayed.generation, s.generation());
    }

    #[test]
    fn test_surface_from_previous_document_is_ignored() {
        let (mut s, old_epoch) = ready(3);
        let request = s.render_request().unwrap();
        s.begin_open(chain());

        assert!(!s.apply_surface(old_epoch, surface_for(&request)));
        assert!(s.displayed().is_none());
    }

    #[test]
    fn test_candidate_failures_are_recorded() {
        let mut s = session();
        let epoch = s.begin_open(chain());
        let c = candidate(CandidateKind::Given);
        s.candidate_selected(epoch, &c);
        s.candidate_failed(
            epoch,
            &c,
            &FetchError::CandidateFailed {
                url: c.url.clone(),
                reason: crate::fetch::FailureReason::Status(404),
            },
        );

        assert_eq!(s.load_state(), LoadState::Resolving);
        assert_eq!(s.events().len(), 1);
        assert!(matches!(
            s.events()[0].error,
            ViewerError::CandidateUnreachable { .. }
        ));
    }

    #[test]
    fn test_exhausted_chain_reports_external_target() {
        let mut s = session();
        let epoch = s.begin_open(chain());
        s.chain_exhausted(epoch, 3);

        let state = s.view_state();
        assert_eq!(state.load_state, LoadState::Error);
        let report = state.error.unwrap();
        assert_eq!(report.kind, "chain_exhausted");
        assert_eq!(
            report.external_url.as_deref(),
            Some("http://files.local/docs/a.pdf")
        );
    }

    #[test]
    fn test_decode_failure_falls_back_to_native_embed() {
        let mut s = session();
        let epoch = s.begin_open(chain());
        let c = candidate(CandidateKind::Given);
        s.candidate_selected(epoch, &c);
        s.fetched(epoch, &c, &content(), None);
        s.decode_failed(epoch, DocumentError::UnsupportedContent("corrupt".into()));

        assert_eq!(s.load_state(), LoadState::Error);
        assert_eq!(s.strategy(), RenderStrategy::NativeEmbed);
        assert_eq!(s.embed_url().as_deref(), Some("http://files.local/docs/a.pdf"));
        assert!(s.retry().is_some());
        assert_eq!(s.strategy(), RenderStrategy::CanvasRaster);
    }

    #[test]
    fn test_render_failure_falls_back() {
        let (mut s, epoch) = ready(3);
        let request = s.render_request().unwrap();

        assert!(s.render_failed(&request, &DocumentError::RenderError("x".into())));
        assert_eq!(s.strategy(), RenderStrategy::NativeEmbed);
        // Ready stays Ready; only presentation changed
        assert_ready_invariants(&s);
        assert!(s.render_request().is_none());

        assert!(s.embed_failed(epoch, FallbackReason::EmbedTimeout));
        assert_eq!(s.strategy(), RenderStrategy::IframeEmbed);
        assert!(!s.embed_failed(epoch, FallbackReason::EmbedTimeout));
    }

    #[test]
    fn test_stale_render_failure_is_ignored() {
        let (mut s, _) = ready(3);
        let request = s.render_request().unwrap();
        s.next_page();

        assert!(!s.render_failed(&request, &DocumentError::RenderError("x".into())));
        assert_eq!(s.strategy(), RenderStrategy::CanvasRaster);
    }

    #[test]
    fn test_close_releases_handle() {
        let (mut s, _) = ready(3);
        let lease = s.render_request().unwrap().lease;
        assert!(lease.is_live());

        s.close();
        assert!(!lease.is_live());
        assert_eq!(s.load_state(), LoadState::Idle);
        assert!(!s.has_document());
        assert_eq!(s.view_state().total_pages, 0);
    }

    #[test]
    fn test_open_replaces_and_releases_previous_document() {
        let (mut s, _) = ready(3);
        let lease = s.render_request().unwrap().lease;

        s.begin_open(chain());
        assert!(!lease.is_live());
        assert_eq!(s.load_state(), LoadState::Resolving);
    }

    #[test]
    fn test_stale_decode_is_released() {
        let mut s = session();
        let old = s.begin_open(chain());
        s.begin_open(chain());

        let handle = DecodedHandle::new(FakeDocument::new(3));
        let lease = handle.lease();
        assert!(s.decoded(old, handle).is_none());
        assert!(!lease.is_live());
        assert_eq!(s.load_state(), LoadState::Resolving);
    }

    #[test]
    fn test_jump_clamps() {
        let (mut s, _) = ready(5);
        s.jump_to_page(42);
        assert_eq!(s.current_page(), 5);
        s.jump_to_page(-1);
        assert_eq!(s.current_page(), 1);
        assert_ready_invariants(&s);
    }

    #[test]
    fn test_zoom_stays_within_bounds() {
        let (mut s, _) = ready(1);
        for _ in 0..20 {
            s.zoom_in();
            assert_ready_invariants(&s);
        }
        assert_eq!(s.scale(), 3.0);
        for _ in 0..20 {
            s.zoom_out();
            assert_ready_invariants(&s);
        }
        assert_eq!(s.scale(), 0.5);
        s.reset_zoom();
        assert_eq!(s.scale(), 1.5);
    }

    #[test]
    fn test_blob_candidate_keeps_local_copy() {
        let mut s = session();
        let epoch = s.begin_open(chain());
        let c = candidate(CandidateKind::BinaryBlob);
        s.candidate_selected(epoch, &c);
        let blob = LocalBlob::spill(Arc::new(content().bytes), "a.pdf").unwrap();
        let location = blob.location().to_string();
        s.fetched(epoch, &c, &content(), Some(blob));

        assert_eq!(s.external_target().unwrap(), location);
        // Publishing again reads the stored location
        s.view_state();
        assert_eq!(s.external_target().unwrap(), location);
    }

    #[test]
    fn test_unspilled_blob_falls_back_to_nominal_url() {
        let mut s = session();
        let epoch = s.begin_open(chain());
        let c = candidate(CandidateKind::BinaryBlob);
        s.candidate_selected(epoch, &c);
        s.fetched(epoch, &c, &content(), None);
        s.decode_failed(epoch, DocumentError::UnsupportedContent("corrupt".into()));

        assert!(s.embed_url().is_none());
        assert_eq!(
            s.external_target().unwrap(),
            "http://files.local/docs/a.pdf"
        );
    }
}
