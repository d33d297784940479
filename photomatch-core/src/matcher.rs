//! Search-by-photo over the catalog.
//!
//! A search fingerprints the query once, then fans out one unit of work per
//! candidate: fetch the thumbnail, decode it, fingerprint it, and measure the
//! Hamming distance to the query. Units are independent; each one ends in a
//! [`CandidateOutcome`], either a distance or the reason it was skipped.
//!
//! At most `concurrency` units are in progress at a time, each owning its
//! inputs so the whole search can be spawned. Decoding and hashing run on
//! the blocking pool behind a semaphore of `decode_concurrency` permits. The
//! fetch deadline covers the fetch alone: a unit waiting for a decode permit
//! has already finished fetching, so decode backpressure never shows up as a
//! timeout. Completion order never reaches the result: outcomes are
//! re-indexed by catalog position before ranking.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{CandidateRef, CandidateSource};
use crate::error::Result;
use crate::fetch::{decode_payload, fetch_bytes, FetchFailure, ImageFetcher, DEFAULT_FETCH_TIMEOUT};
use crate::fingerprint::{Fingerprint, HashAlgorithm, PerceptualHasher, CANONICAL_SIZE};

/// Default Hamming distance threshold.
pub const DEFAULT_THRESHOLD: u32 = 30;

/// Default number of results returned.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Default number of simultaneous image fetches.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Matcher configuration, fixed for the lifetime of a deployment.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Hash algorithm for both query and candidates.
    pub algorithm: HashAlgorithm,
    /// Side of the normalized square images are resized to.
    pub canonical_size: u32,
    /// Maximum in-flight fetches per search.
    pub concurrency: usize,
    /// Maximum concurrent decode/hash jobs per search.
    pub decode_concurrency: usize,
    /// Deadline for each individual fetch.
    pub fetch_timeout: Duration,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            canonical_size: CANONICAL_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            decode_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Per-request search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Largest Hamming distance that still counts as a match.
    pub threshold: u32,
    /// Cap on the number of results.
    pub max_results: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// A candidate within the threshold, with its distance to the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub candidate: CandidateRef,
    pub distance: u32,
}

/// What one unit of work produced for its candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    Scored(u32),
    Skipped(FetchFailure),
}

/// Ranked matches plus counters describing the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub matches: Vec<MatchResult>,
    /// Whether the query image could be fingerprinted at all.
    pub query_decoded: bool,
    /// Candidates enumerated from the catalog.
    pub candidates: usize,
    /// Candidates that produced a distance.
    pub scored: usize,
    /// Candidates skipped because of a fetch, decode or hash failure.
    pub skipped: usize,
}

/// Orchestrates fetch, fingerprint and compare across the whole catalog.
pub struct SimilarityMatcher {
    catalog: Arc<dyn CandidateSource>,
    fetcher: Arc<dyn ImageFetcher>,
    hasher: PerceptualHasher,
    config: MatcherConfig,
}

impl SimilarityMatcher {
    pub fn new(
        catalog: Arc<dyn CandidateSource>,
        fetcher: Arc<dyn ImageFetcher>,
        config: MatcherConfig,
    ) -> Self {
        let hasher = PerceptualHasher::new(config.algorithm).with_canonical_size(config.canonical_size);
        Self {
            catalog,
            fetcher,
            hasher,
            config,
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn hasher(&self) -> PerceptualHasher {
        self.hasher
    }

    /// Find catalog items that look like `query`.
    ///
    /// Returns at most `params.max_results` matches with distance at most
    /// `params.threshold`, closest first, ties in catalog order. An empty or
    /// undecodable query yields no matches. Only a catalog failure is an
    /// error.
    pub async fn search(&self, query: &[u8], params: SearchParams) -> Result<Vec<MatchResult>> {
        Ok(self.search_with_report(query, params).await?.matches)
    }

    /// Same as [`search`](Self::search), but also reports batch counters.
    #[instrument(
        level = "debug",
        skip_all,
        fields(
            query_bytes = query.len(),
            threshold = params.threshold,
            max_results = params.max_results,
            algorithm = %self.config.algorithm
        )
    )]
    pub async fn search_with_report(
        &self,
        query: &[u8],
        params: SearchParams,
    ) -> Result<SearchReport> {
        let Some(query_fingerprint) = self.fingerprint_query(query).await else {
            return Ok(SearchReport::default());
        };
        debug!(fingerprint = %query_fingerprint, "Query fingerprinted");

        let candidates = self.catalog.list_candidates().await.map_err(|e| {
            warn!(error = %e, "Failed to enumerate catalog candidates");
            e
        })?;

        let outcomes = self.score_candidates(&candidates, query_fingerprint).await;
        let report = rank(candidates, outcomes, params);

        info!(
            candidates = report.candidates,
            scored = report.scored,
            skipped = report.skipped,
            matches = report.matches.len(),
            "Image search completed"
        );

        Ok(report)
    }

    async fn fingerprint_query(&self, query: &[u8]) -> Option<Fingerprint> {
        if query.is_empty() {
            debug!("Empty query image");
            return None;
        }

        let hasher = self.hasher;
        let bytes = query.to_vec();
        match tokio::task::spawn_blocking(move || hasher.fingerprint_bytes(&bytes)).await {
            Ok(Ok(fingerprint)) => Some(fingerprint),
            Ok(Err(e)) => {
                debug!(error = %e, "Query image is not decodable");
                None
            }
            Err(e) => {
                warn!(error = %e, "Query fingerprint task failed");
                None
            }
        }
    }

    /// One outcome per candidate, in candidate order.
    async fn score_candidates(
        &self,
        candidates: &[CandidateRef],
        query: Fingerprint,
    ) -> Vec<CandidateOutcome> {
        let hasher = self.hasher;
        let timeout = self.config.fetch_timeout;
        let decode_slots = Arc::new(Semaphore::new(self.config.decode_concurrency.max(1)));

        let locations: Vec<String> = candidates.iter().map(|c| c.image_url.clone()).collect();

        let mut indexed: Vec<(usize, CandidateOutcome)> = stream::iter(locations.into_iter().enumerate())
            .map(move |(index, location)| {
                let fetcher = Arc::clone(&self.fetcher);
                let decode_slots = Arc::clone(&decode_slots);
                async move {
                    let outcome =
                        score_candidate(fetcher, location, timeout, hasher, query, decode_slots).await;
                    (index, outcome)
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// Fetch, decode, fingerprint and compare a single candidate.
async fn score_candidate(
    fetcher: Arc<dyn ImageFetcher>,
    location: String,
    timeout: Duration,
    hasher: PerceptualHasher,
    query: Fingerprint,
    decode_slots: Arc<Semaphore>,
) -> CandidateOutcome {
    let bytes = match fetch_bytes(fetcher.as_ref(), &location, timeout).await {
        Ok(bytes) => bytes,
        Err(failure) => return CandidateOutcome::Skipped(failure),
    };

    let Ok(_permit) = decode_slots.acquire_owned().await else {
        return CandidateOutcome::Skipped(FetchFailure::Hashing("decode pool closed".into()));
    };

    let scored = tokio::task::spawn_blocking(move || {
        let image = decode_payload(hasher, &bytes)?;
        query
            .hamming_distance(&hasher.fingerprint(&image))
            .map_err(|e| FetchFailure::Hashing(e.to_string()))
    })
    .await;

    match scored {
        Ok(Ok(distance)) => CandidateOutcome::Scored(distance),
        Ok(Err(failure)) => CandidateOutcome::Skipped(failure),
        Err(e) => CandidateOutcome::Skipped(FetchFailure::Hashing(format!("hash task failed: {e}"))),
    }
}

/// Filter by threshold, order by distance then catalog position, truncate.
fn rank(
    candidates: Vec<CandidateRef>,
    outcomes: Vec<CandidateOutcome>,
    params: SearchParams,
) -> SearchReport {
    debug_assert_eq!(candidates.len(), outcomes.len());

    let mut report = SearchReport {
        query_decoded: true,
        candidates: candidates.len(),
        ..Default::default()
    };

    for (candidate, outcome) in candidates.into_iter().zip(outcomes) {
        match outcome {
            CandidateOutcome::Scored(distance) => {
                report.scored += 1;
                if distance <= params.threshold {
                    report.matches.push(MatchResult { candidate, distance });
                }
            }
            CandidateOutcome::Skipped(reason) => {
                report.skipped += 1;
                debug!(
                    candidate_id = %candidate.id,
                    image_url = %candidate.image_url,
                    reason = reason.kind(),
                    error = %reason,
                    "Candidate skipped"
                );
            }
        }
    }

    // Stable: equal distances keep catalog order.
    report.matches.sort_by_key(|m| m.distance);
    report.matches.truncate(params.max_results);
    report
}
