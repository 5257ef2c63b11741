//! Remote index fetching

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::RemoteCatalogEntry;
use crate::constants;

/// Fetches the published index. A seam so refresh logic is testable without
/// a network; timeouts and retries belong to the HTTP client configuration,
/// not here.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    async fn fetch_index(&self) -> Result<Vec<RemoteCatalogEntry>>;
}

/// Production fetcher against the published extension repository.
pub struct HttpCatalogFetcher {
    http: reqwest::Client,
    index_url: String,
}

impl HttpCatalogFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_index_url(http, format!("{}/index.min.json", constants::REPO_BASE_URL))
    }

    /// Point at a different repository, mainly for mirrors.
    pub fn with_index_url(http: reqwest::Client, index_url: String) -> Self {
        Self { http, index_url }
    }
}

#[async_trait]
impl CatalogFetcher for HttpCatalogFetcher {
    async fn fetch_index(&self) -> Result<Vec<RemoteCatalogEntry>> {
        let entries = self
            .http
            .get(&self.index_url)
            .send()
            .await
            .with_context(|| format!("failed to fetch extension index from {}", self.index_url))?
            .error_for_status()
            .with_context(|| format!("index request failed for {}", self.index_url))?
            .json::<Vec<RemoteCatalogEntry>>()
            .await
            .context("failed to parse extension index")?;

        Ok(entries)
    }
}
