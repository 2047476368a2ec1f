//! Viewer facade
//!
//! The interface the hosting UI shell drives. Every operation returns at once;
//! fetch, decode and raster run as spawned tasks that report back into the
//! session, and observers see each change through [`Viewer::observe_state`].
//!
//! Ordering follows the render generation: a page or zoom change issued later
//! always wins over an earlier raster that completes after it.

mod engine;
mod external;
mod registry;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::{watch, Notify};

use crate::document::{DocumentError, DocumentReference};
use crate::error::ViewerError;
use crate::fetch::FetchedContent;
use crate::raster::Surface;
use crate::resolve::{CandidateKind, ResolutionChain};
use crate::session::{DocumentSession, LocalBlob, RenderRequest, ViewState};
use crate::strategy::{wait_for_native_load, FallbackReason, RenderStrategy};

pub use engine::{EngineBuilder, ViewerEngine};
pub use external::{ExternalOpener, ShellOpener, SystemOpener};
pub use registry::{LoadGuard, LoadRegistry};

/// One viewer slot holding at most one open document
#[derive(Clone)]
pub struct Viewer {
    inner: Arc<ViewerInner>,
}

struct ViewerInner {
    id: u64,
    engine: Arc<ViewerEngine>,
    session: Mutex<DocumentSession>,
    state: watch::Sender<ViewState>,
    pending: AtomicUsize,
    idle: Notify,
}

/// Decrements the pending-task count even if the task panics
struct TaskGuard(Arc<ViewerInner>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl Viewer {
    fn new(engine: Arc<ViewerEngine>, id: u64) -> Self {
        let session = DocumentSession::new(engine.bounds, engine.config.surface_cache_size);
        let (state, _) = watch::channel(session.view_state());
        Self {
            inner: Arc::new(ViewerInner {
                id,
                engine,
                session: Mutex::new(session),
                state,
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    fn session(&self) -> MutexGuard<'_, DocumentSession> {
        self.inner.session.lock()
    }

    fn publish(&self, session: &DocumentSession) {
        self.inner.state.send_replace(session.view_state());
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        let guard = TaskGuard(self.inner.clone());
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Resolves once no fetch, decode, raster or embed wait is in flight
    pub async fn settle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    // Observation

    /// Stream of snapshots, one per state change
    pub fn observe_state(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    /// Current snapshot
    pub fn state(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    /// Surface currently on screen
    pub fn displayed_surface(&self) -> Option<Surface> {
        self.session().displayed().cloned()
    }

    pub fn reference(&self) -> Option<DocumentReference> {
        self.session().reference().cloned()
    }

    /// File name for "download" actions
    pub fn download_name(&self) -> Option<String> {
        self.session().reference().map(DocumentReference::download_name)
    }

    // Lifecycle

    /// Open `reference`, replacing whatever this viewer shows.
    ///
    /// Opening the reference this viewer is already loading is a no-op.
    /// Fails with [`ViewerError::LoadInProgress`] when another viewer of the
    /// same engine is loading it.
    pub fn open_document(&self, reference: DocumentReference) -> Result<(), ViewerError> {
        {
            let session = self.session();
            if session.load_state().is_loading() && session.reference() == Some(&reference) {
                tracing::debug!(key = %reference.key(), "Already loading, ignoring open");
                return Ok(());
            }
        }
        self.start_load(reference)
    }

    /// Restart the whole chain for the current reference, e.g. after re-login
    pub fn reopen(&self) -> Result<(), ViewerError> {
        let reference = self.reference().ok_or(ViewerError::NothingToOpen)?;
        self.start_load(reference)
    }

    fn start_load(&self, reference: DocumentReference) -> Result<(), ViewerError> {
        let engine = &self.inner.engine;
        let guard = engine
            .loads
            .try_acquire(&reference.key(), self.inner.id)
            .ok_or_else(|| ViewerError::LoadInProgress(reference.display_name().to_string()))?;
        engine.loads.release_owner_except(self.inner.id, &guard);

        tracing::info!(key = %reference.key(), name = %reference.display_name(), "Opening document");

        let chain = ResolutionChain::new(reference, engine.rules.clone());
        let epoch = {
            let mut session = self.session();
            let epoch = session.begin_open(chain);
            self.publish(&session);
            epoch
        };

        let viewer = self.clone();
        self.spawn(async move { viewer.run_load(epoch, guard).await });
        Ok(())
    }

    /// After a terminal error, continue with the next untried candidate
    pub fn retry(&self) -> Result<(), ViewerError> {
        let reference = self.reference().ok_or(ViewerError::NothingToOpen)?;
        let guard = self
            .inner
            .engine
            .loads
            .try_acquire(&reference.key(), self.inner.id)
            .ok_or_else(|| ViewerError::LoadInProgress(reference.display_name().to_string()))?;

        let epoch = {
            let mut session = self.session();
            let epoch = session.retry().ok_or(ViewerError::NotReady)?;
            self.publish(&session);
            epoch
        };

        let viewer = self.clone();
        self.spawn(async move { viewer.run_load(epoch, guard).await });
        Ok(())
    }

    /// Close the document and release it
    pub fn close(&self) {
        {
            let mut session = self.session();
            session.close();
            self.publish(&session);
        }
        self.inner.engine.loads.release_owner(self.inner.id);
    }

    // Navigation

    pub fn next_page(&self) {
        self.navigate(DocumentSession::next_page);
    }

    pub fn prev_page(&self) {
        self.navigate(DocumentSession::prev_page);
    }

    /// Jump to page `n`, clamped into range
    pub fn jump_to_page(&self, n: i64) {
        self.navigate(|s| s.jump_to_page(n));
    }

    pub fn zoom_in(&self) {
        self.navigate(DocumentSession::zoom_in);
    }

    pub fn zoom_out(&self) {
        self.navigate(DocumentSession::zoom_out);
    }

    /// Absolute zoom, clamped to the configured bounds
    pub fn set_zoom(&self, value: f32) {
        self.navigate(|s| s.set_zoom(value));
    }

    /// Relative zoom, clamped to the configured bounds
    pub fn zoom_by(&self, delta: f32) {
        self.navigate(|s| s.zoom_by(delta));
    }

    pub fn reset_zoom(&self) {
        self.navigate(DocumentSession::reset_zoom);
    }

    fn navigate<F>(&self, change: F)
    where
        F: FnOnce(&mut DocumentSession) -> Option<RenderRequest>,
    {
        let request = {
            let mut session = self.session();
            let request = change(&mut session);
            self.publish(&session);
            request
        };
        if let Some(request) = request {
            self.spawn_render(request);
        }
    }

    /// "Open in new window". Always available once something was opened,
    /// whatever the load state; returns the target handed to the opener.
    pub fn open_externally(&self) -> Result<String, ViewerError> {
        let target = self
            .session()
            .external_target()
            .ok_or(ViewerError::NothingToOpen)?;

        if let Err(e) = self.inner.engine.opener.open(&target) {
            tracing::warn!(location = %target, error = %e, "External opener failed");
        }
        Ok(target)
    }

    // Tasks

    async fn run_load(self, epoch: u64, _guard: LoadGuard) {
        let engine = self.inner.engine.clone();
        let Some(mut chain) = self.session().take_chain(epoch) else {
            return;
        };

        loop {
            let token = engine.credentials.token();
            let next = chain
                .next_candidate(engine.fetcher.as_ref(), token.as_deref())
                .await;

            let Some(candidate) = next else {
                let attempted = chain.attempted().len();
                let mut session = self.session();
                session.restore_chain(epoch, chain);
                if session.chain_exhausted(epoch, attempted) {
                    self.publish(&session);
                }
                return;
            };

            {
                let mut session = self.session();
                if !session.candidate_selected(epoch, &candidate) {
                    return;
                }
                self.publish(&session);
            }

            let fetched = engine
                .fetcher
                .fetch(&candidate.url, token.as_deref())
                .await
                .and_then(FetchedContent::ensure_document);

            let content = match fetched {
                Ok(content) => content,
                Err(e) if e.is_unauthorized() => {
                    let mut session = self.session();
                    session.restore_chain(epoch, chain);
                    if session.unauthorized(epoch, e.url()) {
                        self.publish(&session);
                    }
                    return;
                }
                Err(e) => {
                    let mut session = self.session();
                    if !session.candidate_failed(epoch, &candidate, &e) {
                        return;
                    }
                    self.publish(&session);
                    continue;
                }
            };

            let blob = if candidate.kind == CandidateKind::BinaryBlob {
                let file_name = self
                    .reference()
                    .map(|r| r.download_name())
                    .unwrap_or_else(|| "document.pdf".to_string());
                match LocalBlob::spill_blocking(Arc::new(content.bytes.clone()), file_name).await {
                    Ok(blob) => Some(blob),
                    Err(e) => {
                        tracing::warn!(url = %candidate.url, error = %e, "Failed to spill blob");
                        None
                    }
                }
            } else {
                None
            };

            let name = {
                let mut session = self.session();
                session.restore_chain(epoch, chain);
                if !session.fetched(epoch, &candidate, &content, blob) {
                    return;
                }
                self.publish(&session);
                session
                    .reference()
                    .map(|r| r.display_name().to_string())
                    .unwrap_or_default()
            };

            let decoded = engine.decoder.decode(content.bytes, &name).await;

            let render = {
                let mut session = self.session();
                match decoded {
                    Ok(handle) => {
                        let request = session.decoded(epoch, handle);
                        self.publish(&session);
                        request.map(Ok)
                    }
                    Err(e) => {
                        if !session.decode_failed(epoch, e) {
                            return;
                        }
                        self.publish(&session);
                        Some(Err(epoch))
                    }
                }
            };

            match render {
                Some(Ok(request)) => self.spawn_render(request),
                Some(Err(epoch)) => self.start_embed(epoch),
                None => {}
            }
            return;
        }
    }

    fn spawn_render(&self, request: RenderRequest) {
        let viewer = self.clone();
        self.spawn(async move { viewer.run_render(request).await });
    }

    fn is_current(&self, request: &RenderRequest) -> bool {
        let session = self.session();
        session.is_current(request.epoch) && session.generation() == request.generation
    }

    async fn run_render(self, request: RenderRequest) {
        let rasterizer = self.inner.engine.rasterizer.clone();
        let (page, scale, generation) = (request.page, request.scale, request.generation);

        let mut outcome = rasterizer.render(&request.lease, page, scale, generation).await;
        if let Err(e) = &outcome {
            if matches!(e, DocumentError::Released) || !self.is_current(&request) {
                return;
            }
            tracing::warn!(page, generation, error = %e, "Raster failed, retrying once");
            outcome = rasterizer.render(&request.lease, page, scale, generation).await;
        }

        let fell_back = {
            let mut session = self.session();
            match outcome {
                Ok(surface) => {
                    if session.apply_surface(request.epoch, surface) {
                        self.publish(&session);
                    }
                    false
                }
                Err(e) => {
                    let fell_back = session.render_failed(&request, &e);
                    if fell_back {
                        self.publish(&session);
                    }
                    fell_back
                }
            }
        };

        if fell_back {
            self.start_embed(request.epoch);
        }
    }

    /// Wait, bounded, for the native embed; fall back to the iframe otherwise
    fn start_embed(&self, epoch: u64) {
        let url = {
            let session = self.session();
            if !session.is_current(epoch) || session.strategy() != RenderStrategy::NativeEmbed {
                return;
            }
            session.embed_url()
        };

        let viewer = self.clone();
        self.spawn(async move { viewer.run_embed(epoch, url).await });
    }

    async fn run_embed(self, epoch: u64, url: Option<String>) {
        let engine = self.inner.engine.clone();
        let outcome = match &url {
            Some(url) => {
                let wait = Duration::from_millis(engine.config.embed_timeout_ms);
                wait_for_native_load(engine.embed_host.as_ref(), url, wait).await
            }
            None => Err(None),
        };

        let reason = match outcome {
            Ok(()) => {
                tracing::debug!(url = ?url, "Native embed loaded");
                return;
            }
            Err(None) => FallbackReason::EmbedTimeout,
            Err(Some(e)) => FallbackReason::EmbedFailed(e.to_string()),
        };

        let mut session = self.session();
        if session.embed_failed(epoch, reason) {
            self.publish(&session);
        }
    }
}
