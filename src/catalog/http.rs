//! HTTP catalog client
//!
//! Thin JSON client for the inventory application's catalog search endpoint:
//! `GET {base}/parts/search?query=...&limit=...` returning an array of
//! catalog items.

use async_trait::async_trait;
use tracing::debug;

use super::{CatalogItem, CatalogSearch, LookupError};

/// Catalog search over the inventory REST API
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    /// Create a client for the catalog service at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CatalogSearch for HttpCatalog {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogItem>, LookupError> {
        let url = format!("{}/parts/search", self.base_url.trim_end_matches('/'));

        debug!("Catalog lookup: {:?} (limit {})", query, limit);

        let limit_param = limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("query", query), ("limit", limit_param.as_str())])
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let items: Vec<CatalogItem> = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        debug!("Catalog lookup {:?}: {} items", query, items.len());
        Ok(items)
    }
}
