//! Image retrieval for catalog candidates.
//!
//! Every failure here is local to one candidate: the matcher turns a
//! [`FetchFailure`] into "no match contribution" and carries on with the rest
//! of the batch. There are no retries; one attempt per candidate.

#[cfg(feature = "network")]
mod http_client;
mod memory;

#[cfg(feature = "network")]
pub use http_client::{HttpFetcherConfig, HttpImageFetcher};
pub use memory::InMemoryFetcher;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::fingerprint::{NormalizedImage, PerceptualHasher};

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on a single image payload (20 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Why a single candidate image could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("source returned status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("empty payload")]
    EmptyPayload,

    #[error("payload of {size} bytes exceeds limit of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("undecodable payload: {0}")]
    Undecodable(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("unsupported image location: {0}")]
    UnsupportedLocation(String),

    #[error("hashing failed: {0}")]
    Hashing(String),
}

impl FetchFailure {
    /// Short machine-readable label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Status(_) => "status",
            Self::Transport(_) => "transport",
            Self::EmptyPayload => "empty_payload",
            Self::TooLarge { .. } => "too_large",
            Self::Undecodable(_) => "undecodable",
            Self::Io(_) => "io",
            Self::UnsupportedLocation(_) => "unsupported_location",
            Self::Hashing(_) => "hashing",
        }
    }
}

/// Source of raw image bytes, addressed by location string.
///
/// Implementations must be thread-safe (`Send + Sync`); one fetcher is shared
/// by every concurrent unit of a search.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Retrieve the raw bytes behind `location`. Single attempt.
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchFailure>;
}

/// Fetch raw bytes with a hard per-item deadline.
///
/// The returned payload is never empty.
pub async fn fetch_bytes<F>(
    fetcher: &F,
    location: &str,
    timeout: Duration,
) -> Result<Vec<u8>, FetchFailure>
where
    F: ImageFetcher + ?Sized,
{
    let bytes = tokio::time::timeout(timeout, fetcher.fetch(location))
        .await
        .map_err(|_| FetchFailure::Timeout(timeout))??;

    if bytes.is_empty() {
        return Err(FetchFailure::EmptyPayload);
    }

    Ok(bytes)
}

/// Fetch an image and decode it into the hasher's canonical form.
///
/// Decoding runs on the blocking pool.
pub async fn fetch_and_decode<F>(
    fetcher: &F,
    location: &str,
    timeout: Duration,
    hasher: PerceptualHasher,
) -> Result<NormalizedImage, FetchFailure>
where
    F: ImageFetcher + ?Sized,
{
    let bytes = fetch_bytes(fetcher, location, timeout).await?;

    tokio::task::spawn_blocking(move || decode_payload(hasher, &bytes))
        .await
        .map_err(|e| FetchFailure::Hashing(format!("decode task failed: {e}")))?
}

/// Decode fetched bytes into the hasher's canonical form.
///
/// CPU-bound; async callers run it on the blocking pool.
pub fn decode_payload(hasher: PerceptualHasher, bytes: &[u8]) -> Result<NormalizedImage, FetchFailure> {
    hasher
        .decode(bytes)
        .map_err(|e| FetchFailure::Undecodable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, (y * 8) as u8, 90]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[tokio::test]
    async fn test_fetch_and_decode_normalizes() {
        let fetcher = InMemoryFetcher::new().with_image("mem://a", png_bytes());
        let image = fetch_and_decode(
            &fetcher,
            "mem://a",
            DEFAULT_FETCH_TIMEOUT,
            PerceptualHasher::default(),
        )
        .await
        .unwrap();

        assert_eq!(image.width(), crate::fingerprint::CANONICAL_SIZE);
        assert_eq!(image.height(), crate::fingerprint::CANONICAL_SIZE);
    }

    #[tokio::test]
    async fn test_fetch_bytes_rejects_empty_payload() {
        let fetcher = InMemoryFetcher::new().with_image("mem://empty", Vec::new());
        let result = fetch_bytes(&fetcher, "mem://empty", DEFAULT_FETCH_TIMEOUT).await;
        assert_eq!(result, Err(FetchFailure::EmptyPayload));
    }

    #[tokio::test]
    async fn test_fetch_bytes_times_out() {
        let fetcher = InMemoryFetcher::new()
            .with_image("mem://slow", png_bytes())
            .with_delay("mem://slow", Duration::from_secs(5));

        let timeout = Duration::from_millis(50);
        let result = fetch_bytes(&fetcher, "mem://slow", timeout).await;
        assert_eq!(result, Err(FetchFailure::Timeout(timeout)));
    }

    #[tokio::test]
    async fn test_fetch_and_decode_reports_undecodable() {
        let fetcher = InMemoryFetcher::new().with_image("mem://junk", b"<html>404</html>".to_vec());
        let result = fetch_and_decode(
            &fetcher,
            "mem://junk",
            DEFAULT_FETCH_TIMEOUT,
            PerceptualHasher::default(),
        )
        .await;

        assert!(matches!(result, Err(FetchFailure::Undecodable(_))));
    }

    #[test]
    fn test_decode_payload_maps_errors() {
        let hasher = PerceptualHasher::default();
        assert!(decode_payload(hasher, &png_bytes()).is_ok());
        assert!(matches!(
            decode_payload(hasher, b"GIF89a truncated"),
            Err(FetchFailure::Undecodable(_))
        ));
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(FetchFailure::Timeout(Duration::from_secs(1)).kind(), "timeout");
        assert_eq!(FetchFailure::Status(404).kind(), "status");
        assert_eq!(FetchFailure::EmptyPayload.kind(), "empty_payload");
        assert_eq!(
            FetchFailure::TooLarge { size: 2, max: 1 }.to_string(),
            "payload of 2 bytes exceeds limit of 1 bytes"
        );
    }
}
