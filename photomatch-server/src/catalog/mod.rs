//! Product catalog backends for the search endpoint.
//!
//! The server reads candidates from the `products` table in PostgreSQL, or
//! from a JSON file when no database is configured.

pub mod postgres;

pub use postgres::PostgresCatalog;

use photomatch_core::PhotomatchError;
use thiserror::Error;

/// Errors that can occur when reading the catalog store.
#[derive(Debug, Error)]
pub enum CatalogStoreError {
    /// Database connection failed
    #[error("Database connection error: {0}")]
    Connection(String),

    /// SQL query execution failed
    #[error("Query error: {0}")]
    Query(String),
}

impl From<sqlx::Error> for CatalogStoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Query(e.to_string())
    }
}

impl From<CatalogStoreError> for PhotomatchError {
    fn from(e: CatalogStoreError) -> Self {
        PhotomatchError::Catalog(e.to_string())
    }
}
