//! Remote catalog interface
//!
//! The engine treats the part catalog as an async black box: a query string
//! and page size in, a list of items or a typed error out. A lookup failure
//! is distinct from an empty result list.

pub mod http;
pub mod memory;

pub use http::HttpCatalog;
pub use memory::StaticCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One catalog entry
///
/// Only `number` matters to the engine; the remaining fields are display
/// data passed through to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Part number identifier
    pub number: String,
    /// Human-readable part name
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
}

impl CatalogItem {
    /// Create an item with just a part number
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: None,
            description: None,
        }
    }
}

/// Catalog lookup failure
#[derive(Debug, Error)]
pub enum LookupError {
    /// Request never reached the service or the connection broke
    #[error("catalog request failed: {0}")]
    Transport(String),
    /// Service answered with a non-success status
    #[error("catalog service returned status {0}")]
    Status(u16),
    /// Response body could not be decoded
    #[error("invalid catalog response: {0}")]
    Decode(String),
}

/// Asynchronous catalog search
#[async_trait]
pub trait CatalogSearch: Send + Sync + 'static {
    /// Search the catalog for part numbers matching `query`, returning at
    /// most `limit` items. An empty vec is a normal outcome, not an error.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogItem>, LookupError>;
}
