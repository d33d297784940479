//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use photomatch_core::{HashAlgorithm, SearchParams, SimilarityMatcher};

use crate::catalog::PostgresCatalog;
use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Matcher shared by all searches
    pub matcher: Arc<SimilarityMatcher>,
    /// Catalog database, probed by the readiness check when configured
    pub database: Option<PostgresCatalog>,
    /// Parameters applied when a request omits them
    pub default_params: SearchParams,
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
}

impl AppState {
    pub fn new(matcher: SimilarityMatcher, config: &Config) -> Self {
        Self {
            matcher: Arc::new(matcher),
            database: None,
            default_params: config.default_search_params(),
            max_file_size: config.max_file_size(),
        }
    }

    /// Attach the catalog database for readiness probing.
    pub fn with_database(mut self, database: PostgresCatalog) -> Self {
        self.database = Some(database);
        self
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.matcher.config().algorithm
    }
}
