//! Application state management

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::credentials::TokenStore;
use crate::directory::{DirectoryApi, DirectoryCache};
use crate::strategy::ShellEmbedHost;
use crate::viewer::{EngineBuilder, ShellOpener, Viewer, ViewerEngine};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    engine: Arc<ViewerEngine>,
    viewer: Viewer,
    embed_host: Arc<ShellEmbedHost>,
    directory: DirectoryCache,
    tokens: TokenStore,
}

impl AppState {
    /// Create a new application state
    ///
    /// The engine gets the shell-driven embed host and opener, and reads
    /// bearer tokens from `tokens`. Collaborators already set on `engine`
    /// (fetcher, decoder, rasterizer) are kept.
    pub fn new(
        config: Config,
        engine: EngineBuilder,
        directory_api: Arc<dyn DirectoryApi>,
        tokens: TokenStore,
    ) -> Result<Self, StateError> {
        let embed_host = Arc::new(ShellEmbedHost::new());
        let engine = engine
            .embed_host(embed_host.clone())
            .opener(Arc::new(ShellOpener))
            .credentials(Arc::new(tokens.clone()))
            .build()?;
        let viewer = engine.viewer();
        let directory = DirectoryCache::new(
            directory_api,
            Duration::from_secs(config.directory.cache_ttl_secs),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                engine,
                viewer,
                embed_host,
                directory,
                tokens,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn engine(&self) -> &Arc<ViewerEngine> {
        &self.inner.engine
    }

    /// The viewer slot the UI shell drives
    pub fn viewer(&self) -> &Viewer {
        &self.inner.viewer
    }

    pub fn embed_host(&self) -> &ShellEmbedHost {
        &self.inner.embed_host
    }

    pub fn directory(&self) -> &DirectoryCache {
        &self.inner.directory
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Close the open document so its decoded data and spilled blob are
    /// released before exit
    pub fn shutdown(&self) {
        tracing::info!("Shutting down application state...");
        self.inner.viewer.close();
    }
}
