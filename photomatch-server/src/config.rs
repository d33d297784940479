//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use photomatch_core::{
    HashAlgorithm, MatcherConfig, SearchParams, DEFAULT_CONCURRENCY, DEFAULT_MAX_RESULTS,
    DEFAULT_THRESHOLD,
};

/// Largest `max_results` a client may ask for.
pub const MAX_RESULTS_CAP: usize = 100;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum file size per upload in MB (default: 25)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 60)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// PostgreSQL connection string for the product catalog
    pub database_url: Option<String>,
    /// Database connection pool maximum connections (default: 10)
    pub database_max_connections: u32,
    /// JSON catalog file, used when no database is configured
    pub catalog_file: Option<PathBuf>,
    /// Default Hamming distance threshold (default: 30)
    pub default_threshold: u32,
    /// Default number of results (default: 10)
    pub default_max_results: usize,
    /// Simultaneous thumbnail fetches per search (default: 8)
    pub search_concurrency: usize,
    /// Per-thumbnail fetch timeout in seconds (default: 10)
    pub fetch_timeout_secs: u64,
    /// Perceptual hash algorithm (default: phash)
    pub hash_algorithm: HashAlgorithm,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 60,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            database_url: None,
            database_max_connections: 10,
            catalog_file: None,
            default_threshold: DEFAULT_THRESHOLD,
            default_max_results: DEFAULT_MAX_RESULTS,
            search_concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout_secs: 10,
            hash_algorithm: HashAlgorithm::Phash,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let catalog_file = std::env::var("CATALOG_FILE")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let hash_algorithm = match std::env::var("PHOTOMATCH_HASH_ALGORITHM") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring PHOTOMATCH_HASH_ALGORITHM, using phash");
                HashAlgorithm::Phash
            }),
            Err(_) => defaults.hash_algorithm,
        };

        Self {
            port: env_or("PORT", defaults.port),
            host,
            allowed_origins,
            body_limit_mb: env_or("BODY_LIMIT_MB", defaults.body_limit_mb),
            max_file_size_mb: env_or("MAX_FILE_SIZE_MB", defaults.max_file_size_mb),
            timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_or("RATE_LIMIT_PER_SEC", defaults.rate_limit_per_sec),
            rate_limit_burst: env_or("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            database_url,
            database_max_connections: env_or(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            catalog_file,
            default_threshold: env_or("IMAGE_HASH_THRESHOLD", defaults.default_threshold),
            default_max_results: env_or("SEARCH_MAX_RESULTS", defaults.default_max_results),
            search_concurrency: env_or("SEARCH_CONCURRENCY", defaults.search_concurrency),
            fetch_timeout_secs: env_or("IMAGE_FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
            hash_algorithm,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Maximum upload size in bytes
    pub fn max_file_size(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Matcher settings derived from this configuration
    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            algorithm: self.hash_algorithm,
            concurrency: self.search_concurrency.max(1),
            fetch_timeout: self.fetch_timeout(),
            ..Default::default()
        }
    }

    /// Search parameters used when a request omits them
    pub fn default_search_params(&self) -> SearchParams {
        SearchParams {
            threshold: self.default_threshold,
            max_results: self.default_max_results.clamp(1, MAX_RESULTS_CAP),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.timeout_secs, 60);
        assert!(!config.rate_limit_enabled);
        assert!(config.database_url.is_none());
        assert_eq!(config.hash_algorithm, HashAlgorithm::Phash);
    }

    #[test]
    fn test_default_search_params() {
        let params = Config::default().default_search_params();
        assert_eq!(params.threshold, 30);
        assert_eq!(params.max_results, 10);
    }

    #[test]
    fn test_default_search_params_are_clamped() {
        let config = Config {
            default_max_results: 5000,
            ..Default::default()
        };
        assert_eq!(config.default_search_params().max_results, MAX_RESULTS_CAP);
    }

    #[test]
    fn test_matcher_config() {
        let config = Config {
            search_concurrency: 0,
            fetch_timeout_secs: 3,
            hash_algorithm: HashAlgorithm::Dhash,
            ..Default::default()
        };
        let matcher = config.matcher_config();
        assert_eq!(matcher.concurrency, 1);
        assert_eq!(matcher.fetch_timeout, Duration::from_secs(3));
        assert_eq!(matcher.algorithm, HashAlgorithm::Dhash);
    }

    #[test]
    fn test_socket_addr() {
        let addr = Config::default().socket_addr();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }
}
