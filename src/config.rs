//! Configuration management

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub viewer: ViewerConfig,
    pub directory: DirectoryConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where documents live and how candidate URLs are derived
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the collaborator API, e.g. `http://localhost:8000/api`
    pub base_url: String,
    /// Known alternate base path: URLs starting with `from` are also tried
    /// with `to` substituted
    pub alternate_base: Option<BaseRewrite>,
    /// Direct-content endpoint, joined with the file name
    pub direct_content_path: String,
    /// Generic "fetch as binary blob" endpoint, takes `?url=`
    pub blob_endpoint: String,
    /// Authenticated proxy for directory entries, joined with `{id}/`
    pub entry_proxy_path: String,
    /// Root that project files are also served from
    pub media_root: String,
    pub request_timeout_secs: u64,
    /// Bounded wait for the content-type probe
    pub probe_timeout_ms: u64,
    /// Append `_t=<millis>` to network candidates
    pub cache_bust: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseRewrite {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    pub default_scale: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub zoom_step: f32,
    /// Bounded wait for the native embed to signal load
    pub embed_timeout_ms: u64,
    pub render_timeout_secs: u64,
    pub decode_timeout_secs: u64,
    /// Number of rasterized surfaces kept per viewer
    pub surface_cache_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Seeds the process-wide token store
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:8000/api".to_string(),
            alternate_base: None,
            direct_content_path: "/api/pdf-direct/".to_string(),
            blob_endpoint: "/api/files/blob/".to_string(),
            entry_proxy_path: "/api/files/pdf-proxy/".to_string(),
            media_root: "/media/".to_string(),
            request_timeout_secs: 30,
            probe_timeout_ms: 3000,
            cache_bust: false,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            default_scale: 1.5,
            min_scale: 0.5,
            max_scale: 3.0,
            zoom_step: 0.2,
            embed_timeout_ms: 5000,
            render_timeout_secs: 30,
            decode_timeout_secs: 30,
            surface_cache_size: 32,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig { cache_ttl_secs: 10 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            api: ApiConfig::default(),
            viewer: ViewerConfig::default(),
            directory: DirectoryConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Fix up inconsistent scale bounds instead of failing
    pub fn validated(mut self) -> Self {
        if !(self.min_scale > 0.0) || !self.min_scale.is_finite() {
            tracing::warn!(min_scale = self.min_scale, "Invalid min_scale, using 0.5");
            self.min_scale = 0.5;
        }
        if !(self.max_scale >= self.min_scale) || !self.max_scale.is_finite() {
            tracing::warn!(
                max_scale = self.max_scale,
                min_scale = self.min_scale,
                "max_scale below min_scale, using min_scale"
            );
            self.max_scale = self.min_scale;
        }
        let clamped = clamp_or(self.default_scale, self.min_scale, self.max_scale);
        if clamped != self.default_scale {
            tracing::warn!(
                default_scale = self.default_scale,
                clamped,
                "default_scale outside [min_scale, max_scale], clamping"
            );
            self.default_scale = clamped;
        }
        if !(self.zoom_step > 0.0) {
            self.zoom_step = 0.2;
        }
        self
    }
}

fn clamp_or(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let api_defaults = ApiConfig::default();
        let viewer_defaults = ViewerConfig::default();

        let alternate_base = match (env::var("ALT_BASE_FROM"), env::var("ALT_BASE_TO")) {
            (Ok(from), Ok(to)) if !from.is_empty() => Some(BaseRewrite { from, to }),
            _ => None,
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_parse("SERVER_PORT", 3000),
            },
            api: ApiConfig {
                base_url: env::var("API_BASE_URL")?,
                alternate_base,
                direct_content_path: env::var("DIRECT_CONTENT_PATH")
                    .unwrap_or(api_defaults.direct_content_path),
                blob_endpoint: env::var("BLOB_ENDPOINT").unwrap_or(api_defaults.blob_endpoint),
                entry_proxy_path: env::var("ENTRY_PROXY_PATH")
                    .unwrap_or(api_defaults.entry_proxy_path),
                media_root: env::var("MEDIA_ROOT").unwrap_or(api_defaults.media_root),
                request_timeout_secs: env_parse(
                    "REQUEST_TIMEOUT_SECS",
                    api_defaults.request_timeout_secs,
                ),
                probe_timeout_ms: env_parse("PROBE_TIMEOUT_MS", api_defaults.probe_timeout_ms),
                cache_bust: env_parse("CACHE_BUST", false),
            },
            viewer: ViewerConfig {
                default_scale: env_parse("VIEWER_DEFAULT_SCALE", viewer_defaults.default_scale),
                min_scale: env_parse("VIEWER_MIN_SCALE", viewer_defaults.min_scale),
                max_scale: env_parse("VIEWER_MAX_SCALE", viewer_defaults.max_scale),
                zoom_step: env_parse("VIEWER_ZOOM_STEP", viewer_defaults.zoom_step),
                embed_timeout_ms: env_parse("EMBED_TIMEOUT_MS", viewer_defaults.embed_timeout_ms),
                render_timeout_secs: env_parse(
                    "RENDER_TIMEOUT_SECS",
                    viewer_defaults.render_timeout_secs,
                ),
                decode_timeout_secs: env_parse(
                    "DECODE_TIMEOUT_SECS",
                    viewer_defaults.decode_timeout_secs,
                ),
                surface_cache_size: env_parse(
                    "SURFACE_CACHE_SIZE",
                    viewer_defaults.surface_cache_size,
                ),
            }
            .validated(),
            directory: DirectoryConfig {
                cache_ttl_secs: env_parse("DIRECTORY_CACHE_TTL_SECS", 10),
            },
            auth: AuthConfig {
                token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            },
        })
    }
}
