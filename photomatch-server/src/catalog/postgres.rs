//! PostgreSQL implementation of the candidate source.

use async_trait::async_trait;
use photomatch_core::{usable_candidates, CandidateRef, CandidateSource, CatalogEntry};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use super::CatalogStoreError;

/// Read-only view of the `products` table.
///
/// Only rows with a thumbnail are listed, ordered by primary key so that
/// equal distances rank the same way on every search.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

/// Row type for database queries.
#[derive(FromRow)]
struct ProductRow {
    id: String,
    name: Option<String>,
    thumbnail_url: Option<String>,
}

impl From<ProductRow> for CatalogEntry {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            thumbnail_url: row.thumbnail_url,
        }
    }
}

impl PostgresCatalog {
    /// Connect to the catalog database.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, CatalogStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CatalogStoreError::Connection(e.to_string()))?;

        tracing::info!(max_connections, "Catalog database connected");

        Ok(Self { pool })
    }

    /// Create a catalog from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check that the database answers.
    pub async fn ping(&self) -> Result<(), CatalogStoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// All products that have a thumbnail, in primary key order.
    pub async fn list_products(&self) -> Result<Vec<CatalogEntry>, CatalogStoreError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id::text AS id, name, thumbnail_url
            FROM products
            WHERE thumbnail_url IS NOT NULL
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(rows = rows.len(), "Loaded catalog products");

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CandidateSource for PostgresCatalog {
    async fn list_candidates(&self) -> photomatch_core::Result<Vec<CandidateRef>> {
        Ok(usable_candidates(self.list_products().await?))
    }
}
