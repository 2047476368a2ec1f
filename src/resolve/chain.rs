//! Lazily evaluated candidate chain
//!
//! Candidates are produced in a fixed order. The content-type probe is only
//! issued when the earlier candidates have already failed, so a healthy
//! document costs a single request.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::time::timeout;

use crate::document::DocumentReference;
use crate::fetch::{ContentFetcher, FetchError};

use super::rules::ResolutionRules;

/// How a candidate was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// The reference's URL as given
    Given,
    /// Alternate base path substituted
    Rebased,
    /// Project file served from the media root
    MediaPath,
    /// Direct-content endpoint, chosen after the probe
    DirectContent,
    /// Raw bytes through the blob endpoint, held as a local blob
    BinaryBlob,
}

/// One concrete location to try
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub url: String,
    pub kind: CandidateKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Given,
    Rebased,
    MediaPath,
    Probe,
    Blob,
    Done,
}

impl Stage {
    fn next(self) -> Self {
        match self {
            Stage::Given => Stage::Rebased,
            Stage::Rebased => Stage::MediaPath,
            Stage::MediaPath => Stage::Probe,
            Stage::Probe => Stage::Blob,
            Stage::Blob | Stage::Done => Stage::Done,
        }
    }
}

/// Ordered, finite sequence of candidates for one reference.
///
/// No URL is yielded twice. Once [`next_candidate`](Self::next_candidate)
/// returns `None` the chain stays exhausted.
#[derive(Debug)]
pub struct ResolutionChain {
    reference: DocumentReference,
    rules: Arc<ResolutionRules>,
    nominal: String,
    stage: Stage,
    seen: HashSet<String>,
    yielded: Vec<Candidate>,
}

impl ResolutionChain {
    pub fn new(reference: DocumentReference, rules: Arc<ResolutionRules>) -> Self {
        let nominal = rules.nominal_url(&reference);
        Self {
            reference,
            rules,
            nominal,
            stage: Stage::Given,
            seen: HashSet::new(),
            yielded: Vec::new(),
        }
    }

    pub fn reference(&self) -> &DocumentReference {
        &self.reference
    }

    /// Candidate 1, before any rewriting
    pub fn nominal_url(&self) -> &str {
        &self.nominal
    }

    /// Candidates handed out so far, in order
    pub fn attempted(&self) -> &[Candidate] {
        &self.yielded
    }

    pub fn is_exhausted(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Next untried candidate, or `None` when the chain is exhausted.
    ///
    /// May suspend on the content-type probe, which is bounded by the
    /// configured probe timeout.
    pub async fn next_candidate(
        &mut self,
        fetcher: &dyn ContentFetcher,
        token: Option<&str>,
    ) -> Option<Candidate> {
        while self.stage != Stage::Done {
            let stage = self.stage;
            self.stage = stage.next();

            let derived = match stage {
                Stage::Given => Some((self.nominal.clone(), CandidateKind::Given)),
                Stage::Rebased => self
                    .rules
                    .rebased(&self.nominal)
                    .map(|url| (url, CandidateKind::Rebased)),
                Stage::MediaPath => self
                    .rules
                    .media_path(&self.nominal)
                    .map(|url| (url, CandidateKind::MediaPath)),
                Stage::Probe => self
                    .probe_for_direct_content(fetcher, token)
                    .await
                    .map(|url| (url, CandidateKind::DirectContent)),
                Stage::Blob => Some((self.rules.blob(&self.nominal), CandidateKind::BinaryBlob)),
                Stage::Done => None,
            };

            let Some((url, kind)) = derived else {
                continue;
            };
            if !self.seen.insert(url.clone()) {
                tracing::debug!(url = %url, ?kind, "Skipping duplicate candidate");
                continue;
            }

            let candidate = Candidate {
                url: self.rules.finalize(url),
                kind,
            };
            self.yielded.push(candidate.clone());
            return Some(candidate);
        }

        None
    }

    /// Probe candidate 1 and pick the direct-content endpoint when it does
    /// not declare a document type. A failed or timed-out probe counts as
    /// "not confirmed".
    async fn probe_for_direct_content(
        &self,
        fetcher: &dyn ContentFetcher,
        token: Option<&str>,
    ) -> Option<String> {
        let bound = self.rules.probe_timeout();
        let outcome = match timeout(bound, fetcher.probe(&self.nominal, token)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: self.nominal.clone(),
                millis: bound.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(probe) if probe.is_document() => {
                tracing::debug!(url = %self.nominal, "Probe confirms document type");
                None
            }
            Ok(probe) => {
                tracing::debug!(
                    url = %self.nominal,
                    content_type = probe.content_type.as_deref().unwrap_or("-"),
                    "Probe reports non-document content type"
                );
                self.rules
                    .direct_content(&self.nominal, self.reference.display_name())
            }
            Err(e) => {
                tracing::debug!(url = %self.nominal, error = %e, "Probe failed");
                self.rules
                    .direct_content(&self.nominal, self.reference.display_name())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, BaseRewrite};
    use crate::testing::FakeFetcher;

    fn rules(alternate: bool) -> Arc<ResolutionRules> {
        Arc::new(ResolutionRules::from_config(&ApiConfig {
            base_url: "http://files.local/api".to_string(),
            alternate_base: alternate.then(|| BaseRewrite {
                from: "http://files.local/api".to_string(),
                to: "http://backup.local/api".to_string(),
            }),
            probe_timeout_ms: 200,
            ..ApiConfig::default()
        }))
    }

    async fn drain(chain: &mut ResolutionChain, fetcher: &FakeFetcher) -> Vec<Candidate> {
        let mut out = Vec::new();
        while let Some(candidate) = chain.next_candidate(fetcher, None).await {
            out.push(candidate);
        }
        out
    }

    #[tokio::test]
    async fn test_full_chain_order() {
        let fetcher = FakeFetcher::new().with_probe("http://files.local/api/files/3/plan.pdf", "text/html");
        let reference = DocumentReference::from_url("/api/files/3/plan.pdf", "plan.pdf");
        let mut chain = ResolutionChain::new(reference, rules(true));

        let candidates = drain(&mut chain, &fetcher).await;
        let kinds: Vec<_> = candidates.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CandidateKind::Given,
                CandidateKind::Rebased,
                CandidateKind::DirectContent,
                CandidateKind::BinaryBlob,
            ]
        );
        assert_eq!(candidates[1].url, "http://backup.local/api/files/3/plan.pdf");
        assert_eq!(candidates[2].url, "http://files.local/api/pdf-direct/plan.pdf");
        assert!(chain.is_exhausted());
        assert!(chain.next_candidate(&fetcher, None).await.is_none());
    }

    #[tokio::test]
    async fn test_probe_confirming_pdf_skips_direct_content() {
        let fetcher =
            FakeFetcher::new().with_probe("http://files.local/api/files/3/plan.pdf", "application/pdf");
        let reference = DocumentReference::from_url("/api/files/3/plan.pdf", "plan.pdf");
        let mut chain = ResolutionChain::new(reference, rules(false));

        let kinds: Vec<_> = drain(&mut chain, &fetcher).await.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CandidateKind::Given, CandidateKind::BinaryBlob]);
    }

    #[tokio::test]
    async fn test_no_candidate_yielded_twice() {
        // Direct-content endpoint equals the given URL
        let fetcher = FakeFetcher::new();
        let reference = DocumentReference::from_url("/api/pdf-direct/plan.pdf", "plan.pdf");
        let mut chain = ResolutionChain::new(reference, rules(false));

        let candidates = drain(&mut chain, &fetcher).await;
        let mut urls: Vec<_> = candidates.iter().map(|c| c.url.clone()).collect();
        let total = urls.len();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), total);
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_media_path_candidate() {
        let fetcher = FakeFetcher::new();
        let reference =
            DocumentReference::from_url("/api/project_files/2024/01/31/a.pdf", "a.pdf");
        let mut chain = ResolutionChain::new(reference, rules(false));

        let candidates = drain(&mut chain, &fetcher).await;
        assert_eq!(candidates[1].kind, CandidateKind::MediaPath);
        assert_eq!(
            candidates[1].url,
            "http://files.local/media/project_files/2024/01/31/a.pdf"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_probe_is_bounded() {
        let fetcher = FakeFetcher::new().with_hanging_probe();
        let reference = DocumentReference::from_url("/api/files/3/plan.pdf", "plan.pdf");
        let mut chain = ResolutionChain::new(reference, rules(false));

        let first = chain.next_candidate(&fetcher, None).await.unwrap();
        assert_eq!(first.kind, CandidateKind::Given);
        // Timed-out probe counts as "not a document"
        let second = chain.next_candidate(&fetcher, None).await.unwrap();
        assert_eq!(second.kind, CandidateKind::DirectContent);
    }
}
