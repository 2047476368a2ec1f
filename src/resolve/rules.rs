//! Deterministic rewrite rules for candidate URLs

use std::time::Duration;

use reqwest::Url;

use crate::config::{ApiConfig, BaseRewrite};
use crate::document::{DocumentReference, ReferenceTarget};

const PROJECT_FILES: &str = "project_files/";

/// Rules derived from [`ApiConfig`]
#[derive(Debug, Clone)]
pub struct ResolutionRules {
    base: Option<Url>,
    alternate_base: Option<BaseRewrite>,
    direct_content_path: String,
    blob_endpoint: String,
    entry_proxy_path: String,
    media_root: String,
    cache_bust: bool,
    probe_timeout: Duration,
}

impl ResolutionRules {
    pub fn from_config(config: &ApiConfig) -> Self {
        let base = match Url::parse(&config.base_url) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(base_url = %config.base_url, error = %e, "Unparseable API base URL");
                None
            }
        };

        Self {
            base,
            alternate_base: config.alternate_base.clone(),
            direct_content_path: config.direct_content_path.clone(),
            blob_endpoint: config.blob_endpoint.clone(),
            entry_proxy_path: config.entry_proxy_path.clone(),
            media_root: config.media_root.clone(),
            cache_bust: config.cache_bust,
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Absolute form of a possibly relative URL
    pub fn absolutize(&self, url: &str) -> String {
        if Url::parse(url).is_ok() {
            return url.to_string();
        }
        match &self.base {
            Some(base) => base
                .join(url)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| url.to_string()),
            None => url.to_string(),
        }
    }

    /// Candidate 1: the reference's URL as given
    pub fn nominal_url(&self, reference: &DocumentReference) -> String {
        match reference.target() {
            ReferenceTarget::Url(url) => self.absolutize(url),
            ReferenceTarget::Entry(id) => self.absolutize(&format!(
                "{}{}/",
                ensure_trailing_slash(&self.entry_proxy_path),
                urlencoding::encode(id)
            )),
        }
    }

    /// Known alternate base path substituted in
    pub fn rebased(&self, url: &str) -> Option<String> {
        let rewrite = self.alternate_base.as_ref()?;
        let rest = url.strip_prefix(rewrite.from.as_str())?;
        Some(self.absolutize(&format!("{}{}", rewrite.to, rest)))
    }

    /// `.../project_files/YYYY/MM/DD/<file>` served from the media root
    pub fn media_path(&self, url: &str) -> Option<String> {
        let start = url.find(PROJECT_FILES)?;
        let tail = strip_query(&url[start + PROJECT_FILES.len()..]);

        let mut parts = tail.splitn(4, '/');
        let year = parts.next()?;
        let month = parts.next()?;
        let day = parts.next()?;
        let file = parts.next()?;

        let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(year, 4) || !digits(month, 2) || !digits(day, 2) || file.is_empty() {
            return None;
        }

        Some(self.absolutize(&format!(
            "{}{}{}/{}/{}/{}",
            ensure_trailing_slash(&self.media_root),
            PROJECT_FILES,
            year,
            month,
            day,
            file
        )))
    }

    /// Direct-content endpoint derived from the file name.
    ///
    /// Uses the last path segment of `url` when it names a PDF, otherwise the
    /// display name when that does. `None` when neither looks like a PDF.
    pub fn direct_content(&self, url: &str, display_name: &str) -> Option<String> {
        let segment = last_segment(url);
        let file = [segment.as_str(), display_name.trim()]
            .into_iter()
            .find(|name| looks_like_pdf(name))?
            .to_string();

        Some(self.absolutize(&format!(
            "{}{}",
            ensure_trailing_slash(&self.direct_content_path),
            urlencoding::encode(&file)
        )))
    }

    /// Generic "fetch as binary blob" endpoint for `url`
    pub fn blob(&self, url: &str) -> String {
        self.absolutize(&format!(
            "{}?url={}",
            self.blob_endpoint,
            urlencoding::encode(url)
        ))
    }

    /// Apply cache busting when configured
    pub fn finalize(&self, url: String) -> String {
        if !self.cache_bust {
            return url;
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}_t={}",
            url,
            separator,
            chrono::Utc::now().timestamp_millis()
        )
    }
}

fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn last_segment(url: &str) -> String {
    let path = strip_query(url).trim_end_matches('/');
    let segment = path.rsplit('/').next().unwrap_or("");
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn looks_like_pdf(name: &str) -> bool {
    !name.is_empty()
        && mime_guess::from_path(name)
            .first()
            .map(|m| m.essence_str() == "application/pdf")
            .unwrap_or(false)
}
