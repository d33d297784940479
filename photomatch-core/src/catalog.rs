//! Catalog candidates for image search.
//!
//! The catalog store owns product records; the core only reads the subset
//! that carries a usable image location, in the store's natural order.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PhotomatchError, Result};

/// One catalog item that can be compared against a query image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRef {
    /// Catalog identifier of the product.
    pub id: String,
    /// Display name, when the catalog has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Location of the product thumbnail (URL or local path).
    pub image_url: String,
}

/// A catalog record as the store holds it: the image location may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl CatalogEntry {
    /// Convert into a candidate, or `None` when there is no usable image
    /// location (missing, empty or whitespace only).
    pub fn into_candidate(self) -> Option<CandidateRef> {
        let image_url = self.thumbnail_url?.trim().to_string();
        if image_url.is_empty() {
            return None;
        }

        Some(CandidateRef {
            id: self.id,
            name: self.name,
            image_url,
        })
    }
}

/// Keep the entries that can be searched, preserving their order.
pub fn usable_candidates<I>(entries: I) -> Vec<CandidateRef>
where
    I: IntoIterator<Item = CatalogEntry>,
{
    entries
        .into_iter()
        .filter_map(CatalogEntry::into_candidate)
        .collect()
}

/// Enumerates the catalog's searchable items.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// List every candidate with a usable image location, in catalog order.
    ///
    /// A failure here is fatal to the search that asked for it.
    async fn list_candidates(&self) -> Result<Vec<CandidateRef>>;
}

/// A fixed, in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Build a catalog directly from candidates.
    pub fn from_candidates(candidates: Vec<CandidateRef>) -> Self {
        Self::new(
            candidates
                .into_iter()
                .map(|c| CatalogEntry {
                    id: c.id,
                    name: c.name,
                    thumbnail_url: Some(c.image_url),
                })
                .collect(),
        )
    }

    /// Parse a JSON array of `{id, name?, thumbnail_url?}` records.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)
            .map_err(|e| PhotomatchError::SerializationError(format!("Invalid catalog JSON: {}", e)))?;
        Ok(Self::new(entries))
    }

    /// Load a JSON catalog file.
    ///
    /// Relative local thumbnail paths are resolved against the directory
    /// that holds the catalog file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let mut catalog = Self::from_json_str(&json)?;
        if let Some(base) = path.parent() {
            catalog.resolve_relative_paths(base);
        }
        Ok(catalog)
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        for url in self.entries.iter_mut().filter_map(|e| e.thumbnail_url.as_mut()) {
            let location = url.trim();
            if location.is_empty() || location.contains("://") {
                continue;
            }
            if Path::new(location).is_relative() {
                *url = base.join(location).to_string_lossy().into_owned();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CandidateSource for StaticCatalog {
    async fn list_candidates(&self) -> Result<Vec<CandidateRef>> {
        Ok(usable_candidates(self.entries.iter().cloned()))
    }
}
