//! Native embed hosts
//!
//! The native renderer lives in the UI shell. The engine only hands it a URL
//! and waits, bounded, for a load signal.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

/// Embed load error type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmbedError {
    #[error("Native embed unavailable")]
    Unavailable,

    #[error("Native embed load superseded")]
    Superseded,

    #[error("Native embed failed: {0}")]
    Failed(String),
}

/// Platform-native document renderer
#[async_trait]
pub trait EmbedHost: Send + Sync {
    /// Present `url` natively; resolves once the host signals that it loaded
    async fn load_native(&self, url: &str) -> Result<(), EmbedError>;
}

/// Bounded wait on [`EmbedHost::load_native`]. Exceeding `wait` is a failure,
/// not "still loading".
pub async fn wait_for_native_load(
    host: &dyn EmbedHost,
    url: &str,
    wait: Duration,
) -> Result<(), Option<EmbedError>> {
    match tokio::time::timeout(wait, host.load_native(url)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Some(e)),
        Err(_) => Err(None),
    }
}

/// Host without a native renderer; every load fails at once
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessEmbedHost;

#[async_trait]
impl EmbedHost for HeadlessEmbedHost {
    async fn load_native(&self, _url: &str) -> Result<(), EmbedError> {
        Err(EmbedError::Unavailable)
    }
}

/// Embed host driven by the browser UI shell.
///
/// `load_native` parks until the shell reports the load through
/// [`signal_loaded`](Self::signal_loaded) or [`signal_failed`](Self::signal_failed).
#[derive(Default)]
pub struct ShellEmbedHost {
    pending: Mutex<Option<Pending>>,
}

struct Pending {
    url: String,
    tx: oneshot::Sender<Result<(), EmbedError>>,
}

impl ShellEmbedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL the shell is expected to load, if a load is pending
    pub fn pending_url(&self) -> Option<String> {
        self.pending.lock().as_ref().map(|p| p.url.clone())
    }

    /// The shell's native embed loaded. Returns false when nothing was waiting.
    pub fn signal_loaded(&self) -> bool {
        self.resolve(Ok(()))
    }

    pub fn signal_failed(&self, message: impl Into<String>) -> bool {
        self.resolve(Err(EmbedError::Failed(message.into())))
    }

    fn resolve(&self, outcome: Result<(), EmbedError>) -> bool {
        match self.pending.lock().take() {
            Some(pending) => pending.tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl EmbedHost for ShellEmbedHost {
    async fn load_native(&self, url: &str) -> Result<(), EmbedError> {
        let (tx, rx) = oneshot::channel();
        // Replacing a pending load drops its sender, failing the older waiter
        *self.pending.lock() = Some(Pending {
            url: url.to_string(),
            tx,
        });
        tracing::debug!(url = %url, "Waiting for native embed load");

        rx.await.unwrap_or(Err(EmbedError::Superseded))
    }
}
