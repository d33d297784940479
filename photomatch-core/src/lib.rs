//! Photomatch Core - search a product catalog by photo
//!
//! This crate finds catalog products whose thumbnails look like a query image.
//! Images are reduced to 64-bit perceptual fingerprints and ranked by Hamming
//! distance.
//!
//! # Features
//!
//! - Deterministic perceptual hashing (pHash, dHash, Blockhash)
//! - Bounded concurrent fetching of candidate thumbnails over HTTP or from disk
//! - Per-candidate failure isolation: timeouts and bad payloads shrink the
//!   result set, they never fail the search
//! - Stable ranking: ties keep catalog order
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use photomatch_core::{
//!     HttpImageFetcher, MatcherConfig, SearchParams, SimilarityMatcher, StaticCatalog,
//! };
//!
//! # async fn example() -> photomatch_core::Result<()> {
//! let catalog = StaticCatalog::from_json_file("catalog.json")?;
//! let fetcher = HttpImageFetcher::new()?;
//! let matcher = SimilarityMatcher::new(
//!     Arc::new(catalog),
//!     Arc::new(fetcher),
//!     MatcherConfig::default(),
//! );
//!
//! let query = std::fs::read("photo.jpg")?;
//! for m in matcher.search(&query, SearchParams::default()).await? {
//!     println!("{} at distance {}", m.candidate.id, m.distance);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod fetch;
pub mod fingerprint;
pub mod matcher;

// Re-export main types for convenience
pub use catalog::{usable_candidates, CandidateRef, CandidateSource, CatalogEntry, StaticCatalog};
pub use error::{PhotomatchError, Result};
pub use fetch::{
    decode_payload, fetch_and_decode, fetch_bytes, FetchFailure, ImageFetcher, InMemoryFetcher,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_IMAGE_BYTES,
};
pub use fingerprint::{
    hamming_distance, Fingerprint, HashAlgorithm, NormalizedImage, PerceptualHasher,
    CANONICAL_SIZE, FINGERPRINT_BITS,
};
pub use matcher::{
    CandidateOutcome, MatchResult, MatcherConfig, SearchParams, SearchReport, SimilarityMatcher,
    DEFAULT_CONCURRENCY, DEFAULT_MAX_RESULTS, DEFAULT_THRESHOLD,
};

// Network-dependent exports
#[cfg(feature = "network")]
pub use fetch::{HttpFetcherConfig, HttpImageFetcher};
