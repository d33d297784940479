//! In-memory image fetcher for testing and offline catalogs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{FetchFailure, ImageFetcher};

/// Serves canned payloads or failures by location.
///
/// Tracks how many fetches are in flight at once so tests can assert on the
/// matcher's concurrency bound. Unknown locations answer with a 404 status.
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    responses: HashMap<String, Result<Vec<u8>, FetchFailure>>,
    delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, location: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.responses.insert(location.into(), Ok(bytes));
        self
    }

    pub fn with_failure(mut self, location: impl Into<String>, failure: FetchFailure) -> Self {
        self.responses.insert(location.into(), Err(failure));
        self
    }

    /// Delay the response for `location` by `delay`.
    pub fn with_delay(mut self, location: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(location.into(), delay);
        self
    }

    /// Highest number of simultaneous fetches observed so far.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Total number of fetches started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the fetch future is dropped
/// by a timeout.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageFetcher for InMemoryFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, FetchFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if let Some(delay) = self.delays.get(location) {
            tokio::time::sleep(*delay).await;
        } else {
            // Yield so concurrent fetches actually overlap.
            tokio::task::yield_now().await;
        }

        self.responses
            .get(location)
            .cloned()
            .unwrap_or(Err(FetchFailure::Status(404)))
    }
}
