//! Shared engine components
//!
//! One engine holds the collaborators every viewer uses: fetcher, decoder,
//! rasterizer, embed host, external opener and credential provider. Viewers
//! created from the same engine share its in-flight load registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ApiConfig, Config, ViewerConfig};
use crate::credentials::{Anonymous, CredentialProvider};
use crate::document::DocumentDecoder;
use crate::fetch::{ContentFetcher, HttpFetcher};
use crate::formats::default_decoder;
use crate::navigation::ScaleBounds;
use crate::raster::{PageRasterizer, Rasterizer};
use crate::resolve::ResolutionRules;
use crate::strategy::{EmbedHost, HeadlessEmbedHost};

use super::external::{ExternalOpener, SystemOpener};
use super::registry::LoadRegistry;
use super::Viewer;

/// Collaborators shared by all viewers
pub struct ViewerEngine {
    pub(crate) fetcher: Arc<dyn ContentFetcher>,
    pub(crate) decoder: Arc<dyn DocumentDecoder>,
    pub(crate) rasterizer: Arc<dyn PageRasterizer>,
    pub(crate) embed_host: Arc<dyn EmbedHost>,
    pub(crate) opener: Arc<dyn ExternalOpener>,
    pub(crate) credentials: Arc<dyn CredentialProvider>,
    pub(crate) rules: Arc<ResolutionRules>,
    pub(crate) config: ViewerConfig,
    pub(crate) bounds: ScaleBounds,
    pub(crate) loads: LoadRegistry,
    next_viewer_id: AtomicU64,
}

impl ViewerEngine {
    pub fn builder(config: &Config) -> EngineBuilder {
        EngineBuilder::new(config.api.clone(), config.viewer.clone())
    }

    /// New viewer slot backed by this engine
    pub fn viewer(self: &Arc<Self>) -> Viewer {
        let id = self.next_viewer_id.fetch_add(1, Ordering::Relaxed);
        Viewer::new(self.clone(), id)
    }

    pub fn rules(&self) -> &ResolutionRules {
        &self.rules
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn loads(&self) -> &LoadRegistry {
        &self.loads
    }
}

/// Builder for [`ViewerEngine`]; unset collaborators get production defaults
pub struct EngineBuilder {
    api: ApiConfig,
    viewer: ViewerConfig,
    fetcher: Option<Arc<dyn ContentFetcher>>,
    decoder: Option<Arc<dyn DocumentDecoder>>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    embed_host: Option<Arc<dyn EmbedHost>>,
    opener: Option<Arc<dyn ExternalOpener>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl EngineBuilder {
    pub fn new(api: ApiConfig, viewer: ViewerConfig) -> Self {
        Self {
            api,
            viewer: viewer.validated(),
            fetcher: None,
            decoder: None,
            rasterizer: None,
            embed_host: None,
            opener: None,
            credentials: None,
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn DocumentDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn embed_host(mut self, embed_host: Arc<dyn EmbedHost>) -> Self {
        self.embed_host = Some(embed_host);
        self
    }

    pub fn opener(mut self, opener: Arc<dyn ExternalOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> Result<Arc<ViewerEngine>, reqwest::Error> {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(
                Duration::from_secs(self.api.request_timeout_secs),
                Duration::from_millis(self.api.probe_timeout_ms),
            )?),
        };

        let bounds = ScaleBounds::from_config(&self.viewer);
        let rules = Arc::new(ResolutionRules::from_config(&self.api));

        Ok(Arc::new(ViewerEngine {
            fetcher,
            decoder: self
                .decoder
                .unwrap_or_else(|| default_decoder(self.viewer.decode_timeout_secs)),
            rasterizer: self
                .rasterizer
                .unwrap_or_else(|| Arc::new(Rasterizer::with_timeout(self.viewer.render_timeout_secs))),
            embed_host: self.embed_host.unwrap_or_else(|| Arc::new(HeadlessEmbedHost)),
            opener: self.opener.unwrap_or_else(|| Arc::new(SystemOpener)),
            credentials: self.credentials.unwrap_or_else(|| Arc::new(Anonymous)),
            rules,
            config: self.viewer,
            bounds,
            loads: LoadRegistry::new(),
            next_viewer_id: AtomicU64::new(1),
        }))
    }
}
