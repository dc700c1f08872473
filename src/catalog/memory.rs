//! In-memory catalog
//!
//! Prefix-searching catalog over a fixed item list, used by the demo binary
//! and in tests where no catalog service is available.

use async_trait::async_trait;

use super::{CatalogItem, CatalogSearch, LookupError};

/// Fixed in-memory catalog with case-insensitive prefix search
pub struct StaticCatalog {
    items: Vec<CatalogItem>,
}

impl StaticCatalog {
    /// Create a catalog from a list of items
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    /// Number of items in the catalog
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl CatalogSearch for StaticCatalog {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogItem>, LookupError> {
        let needle = query.to_lowercase();
        Ok(self
            .items
            .iter()
            .filter(|item| item.number.to_lowercase().starts_with(&needle))
            .take(limit)
            .cloned()
            .collect())
    }
}
