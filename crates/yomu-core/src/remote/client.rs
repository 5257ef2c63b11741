//! Remote catalog client
//!
//! Fetches and parses the published index, caches it locally, and
//! rate-limits refreshes behind a cool-down window.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::debug;

use super::{CatalogFetcher, RemoteCatalogCache, RemoteCatalogEntry};
use crate::constants;

pub struct RemoteCatalogClient {
    fetcher: Arc<dyn CatalogFetcher>,
    cache: Arc<RemoteCatalogCache>,
    /// Instant of the last successful refresh. Failed fetches do not arm
    /// the cool-down.
    last_check: Mutex<Option<Instant>>,
}

impl RemoteCatalogClient {
    pub fn new(fetcher: Arc<dyn CatalogFetcher>, cache: Arc<RemoteCatalogCache>) -> Self {
        Self {
            fetcher,
            cache,
            last_check: Mutex::new(None),
        }
    }

    /// Cached snapshot, read once at startup so subscribers see data before
    /// the first network refresh completes. Stale beats empty.
    pub fn cached(&self) -> Result<Vec<RemoteCatalogEntry>> {
        self.cache.load_all()
    }

    /// Fetch the index unless the last successful check is within the
    /// cool-down window. Returns `Ok(None)` when skipped.
    ///
    /// On success the cache is replaced wholesale before the new snapshot is
    /// returned, so the cache never runs ahead of what callers publish.
    pub async fn refresh(&self, force: bool) -> Result<Option<Vec<RemoteCatalogEntry>>> {
        if !force {
            let last_check = *self.last_check.lock();
            if let Some(at) = last_check {
                if at.elapsed() < constants::REFRESH_COOLDOWN {
                    debug!(
                        "skipping remote catalog refresh, last checked {:?} ago",
                        at.elapsed()
                    );
                    return Ok(None);
                }
            }
        }

        let entries = self.fetcher.fetch_index().await?;
        self.cache.replace_all(&entries)?;
        *self.last_check.lock() = Some(Instant::now());
        Ok(Some(entries))
    }
}
