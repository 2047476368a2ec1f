//! HTTP content fetcher
//!
//! Attaches the bearer credential when one is present and classifies the
//! response so the resolution chain knows whether to advance.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use super::types::{FailureReason, FetchError, FetchedContent, ProbeResult};
use super::ContentFetcher;

/// reqwest-backed fetcher
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration, probe_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            request_timeout,
            probe_timeout,
        })
    }

    fn classify(url: &str, status: StatusCode) -> Result<(), FetchError> {
        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::CandidateFailed {
                url: url.to_string(),
                reason: FailureReason::Status(status.as_u16()),
            });
        }
        Ok(())
    }

    fn send_error(url: &str, err: reqwest::Error, timeout: Duration) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                millis: timeout.as_millis() as u64,
            }
        } else {
            FetchError::CandidateFailed {
                url: url.to_string(),
                reason: FailureReason::Network(err.to_string()),
            }
        }
    }
}

fn content_type(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, token: Option<&str>) -> Result<FetchedContent, FetchError> {
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::send_error(url, e, self.request_timeout))?;
        Self::classify(url, response.status())?;

        let content_type = content_type(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::CandidateFailed {
                url: url.to_string(),
                reason: FailureReason::Network(e.to_string()),
            })?;

        tracing::debug!(
            url = %url,
            bytes = bytes.len(),
            content_type = content_type.as_deref().unwrap_or("-"),
            "Fetched candidate"
        );

        Ok(FetchedContent {
            url: url.to_string(),
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    async fn probe(&self, url: &str, token: Option<&str>) -> Result<ProbeResult, FetchError> {
        let mut request = self.client.head(url).timeout(self.probe_timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::send_error(url, e, self.probe_timeout))?;
        Self::classify(url, response.status())?;

        Ok(ProbeResult {
            status: response.status().as_u16(),
            content_type: content_type(response.headers()),
        })
    }
}
