//! HTTP and local-file image fetcher.
//!
//! `http://` and `https://` locations are fetched with a shared reqwest client;
//! `file://` locations and bare paths are read from the local filesystem.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{FetchFailure, ImageFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_IMAGE_BYTES};
use crate::error::Result;

/// Configuration for the image fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
    /// Largest accepted payload in bytes.
    pub max_image_bytes: usize,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            user_agent: concat!("photomatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Image fetcher backed by a single pooled HTTP client.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
    config: HttpFetcherConfig,
}

impl HttpImageFetcher {
    /// Create a fetcher with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(HttpFetcherConfig::default())
    }

    /// Create a fetcher with custom configuration.
    pub fn with_config(config: HttpFetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpFetcherConfig {
        &self.config
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_remote(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        let start = Instant::now();

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let declared = response.content_length().unwrap_or(0) as usize;
        self.check_size(declared)?;

        // Chunked bodies carry no length up front; enforce the cap per chunk.
        let mut body = Vec::with_capacity(declared);
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(e))? {
            self.check_size(body.len() + chunk.len())?;
            body.extend_from_slice(&chunk);
        }

        debug!(
            status = %status,
            bytes = body.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Fetched remote image"
        );

        Ok(body)
    }

    async fn fetch_local(&self, path: &Path) -> std::result::Result<Vec<u8>, FetchFailure> {
        if let Ok(metadata) = tokio::fs::metadata(path).await {
            self.check_size(metadata.len() as usize)?;
        }

        tokio::fs::read(path)
            .await
            .map_err(|e| FetchFailure::Io(format!("{}: {}", path.display(), e)))
    }

    fn check_size(&self, size: usize) -> std::result::Result<(), FetchFailure> {
        if size > self.config.max_image_bytes {
            Err(FetchFailure::TooLarge {
                size,
                max: self.config.max_image_bytes,
            })
        } else {
            Ok(())
        }
    }

    fn classify(&self, error: reqwest::Error) -> FetchFailure {
        if error.is_timeout() {
            FetchFailure::Timeout(self.config.timeout)
        } else {
            FetchFailure::Transport(error.to_string())
        }
    }
}

/// Where a location string points.
#[derive(Debug, PartialEq, Eq)]
enum Location<'a> {
    Remote(&'a str),
    Local(&'a Path),
    Unsupported,
}

fn classify_location(location: &str) -> Location<'_> {
    let location = location.trim();
    let lower = location.to_ascii_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        Location::Remote(location)
    } else if lower.starts_with("file://") {
        Location::Local(Path::new(&location["file://".len()..]))
    } else if location.contains("://") || location.is_empty() {
        Location::Unsupported
    } else {
        Location::Local(Path::new(location))
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, location: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        match classify_location(location) {
            Location::Remote(url) => self.fetch_remote(url).await,
            Location::Local(path) => self.fetch_local(path).await,
            Location::Unsupported => Err(FetchFailure::UnsupportedLocation(location.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one chunked response of `chunks` x `chunk_size` bytes.
    /// The task resolves to the number of body bytes actually written.
    async fn serve_chunked(chunks: usize, chunk_size: usize) -> (String, JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;

            let head = "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nTransfer-Encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return 0;
            }

            let payload = vec![0xAB_u8; chunk_size];
            let mut sent = 0;
            for _ in 0..chunks {
                let size_line = format!("{:x}\r\n", chunk_size);
                if socket.write_all(size_line.as_bytes()).await.is_err()
                    || socket.write_all(&payload).await.is_err()
                    || socket.write_all(b"\r\n").await.is_err()
                {
                    break;
                }
                sent += chunk_size;
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
            sent
        });

        (format!("http://{addr}/thumb.png"), handle)
    }

    #[test]
    fn test_classify_location() {
        assert_eq!(
            classify_location("https://cdn.example.com/a.jpg"),
            Location::Remote("https://cdn.example.com/a.jpg")
        );
        assert_eq!(
            classify_location("HTTP://cdn.example.com/a.jpg"),
            Location::Remote("HTTP://cdn.example.com/a.jpg")
        );
        assert_eq!(
            classify_location("file:///srv/img/a.png"),
            Location::Local(Path::new("/srv/img/a.png"))
        );
        assert_eq!(
            classify_location("images/a.png"),
            Location::Local(Path::new("images/a.png"))
        );
        assert_eq!(classify_location("ftp://host/a.png"), Location::Unsupported);
        assert_eq!(classify_location("   "), Location::Unsupported);
    }

    #[test]
    fn test_default_config() {
        let config = HttpFetcherConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_image_bytes, 20 * 1024 * 1024);
        assert!(config.user_agent.starts_with("photomatch/"));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"payload").unwrap();

        let fetcher = HttpImageFetcher::new().unwrap();
        let location = file.path().to_str().unwrap().to_string();
        assert_eq!(fetcher.fetch(&location).await.unwrap(), b"payload");

        let with_scheme = format!("file://{}", location);
        assert_eq!(fetcher.fetch(&with_scheme).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_fetch_local_file_too_large() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 64]).unwrap();

        let fetcher = HttpImageFetcher::with_config(HttpFetcherConfig {
            max_image_bytes: 16,
            ..Default::default()
        })
        .unwrap();

        let result = fetcher.fetch(file.path().to_str().unwrap()).await;
        assert_eq!(result, Err(FetchFailure::TooLarge { size: 64, max: 16 }));
    }

    #[tokio::test]
    async fn test_fetch_missing_local_file() {
        let fetcher = HttpImageFetcher::new().unwrap();
        let result = fetcher.fetch("/nonexistent/photomatch/missing.png").await;
        assert!(matches!(result, Err(FetchFailure::Io(_))));
    }

    #[tokio::test]
    async fn test_fetch_unsupported_scheme() {
        let fetcher = HttpImageFetcher::new().unwrap();
        let result = fetcher.fetch("ftp://example.com/a.png").await;
        assert!(matches!(result, Err(FetchFailure::UnsupportedLocation(_))));
    }

    #[tokio::test]
    async fn test_fetch_chunked_body_within_limit() {
        let (url, server) = serve_chunked(4, 100).await;
        let fetcher = HttpImageFetcher::with_config(HttpFetcherConfig {
            max_image_bytes: 1024,
            ..Default::default()
        })
        .unwrap();

        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body.len(), 400);
        assert_eq!(server.await.unwrap(), 400);
    }

    #[tokio::test]
    async fn test_fetch_chunked_body_stops_at_limit() {
        let chunk_size = 64 * 1024;
        let (url, server) = serve_chunked(64, chunk_size).await;
        let fetcher = HttpImageFetcher::with_config(HttpFetcherConfig {
            max_image_bytes: 1024,
            ..Default::default()
        })
        .unwrap();

        match fetcher.fetch(&url).await {
            Err(FetchFailure::TooLarge { size, max }) => {
                assert_eq!(max, 1024);
                assert!(size <= 1024 + chunk_size, "read {size} bytes before giving up");
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }

        // The connection is dropped early, so the server never gets to
        // write the whole body.
        assert!(server.await.unwrap() < 64 * chunk_size);
    }
}
