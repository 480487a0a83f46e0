//! Read-only song metadata from the host's catalog document.
//!
//! The document is fetched at most once per [`Catalog`] instance. Failed
//! fetches are not cached, so a later caller tries again.

mod index;

pub use index::{CatalogEntry, CatalogIndex};

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::transport::RetryingTransport;

pub const DEFAULT_CATALOG_URL: &str = "https://bestdori.com/api/songs/all.7.json";

/// Site placeholder entries that never have charts.
const PLACEHOLDER_TITLES: &[&str] = &["bestdori", "bestdori!"];

pub fn is_placeholder_title(title: &str) -> bool {
    let title = title.trim().to_lowercase();
    PLACEHOLDER_TITLES.contains(&title.as_str())
}

/// Lazily loaded catalog shared by every song of a run.
pub struct Catalog {
    transport: RetryingTransport,
    url: String,
    cache: Mutex<Option<Arc<CatalogIndex>>>,
}

impl Catalog {
    pub fn new(transport: RetryingTransport, url: &str) -> Self {
        Self {
            transport,
            url: url.to_string(),
            cache: Mutex::new(None),
        }
    }

    /// Returns the parsed catalog, fetching it on first use. `None` when the
    /// catalog is unreachable or unparseable.
    pub async fn index(&self) -> Option<Arc<CatalogIndex>> {
        // Held across the fetch so concurrent callers share a single request.
        let mut cache = self.cache.lock().await;
        if let Some(index) = cache.as_ref() {
            return Some(index.clone());
        }

        let body = match self.transport.fetch(&self.url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Catalog unavailable at {}: {}", self.url, e);
                return None;
            }
        };
        match CatalogIndex::parse(&body) {
            Ok(index) => {
                info!("Loaded catalog with {} songs", index.len());
                let index = Arc::new(index);
                *cache = Some(index.clone());
                Some(index)
            }
            Err(e) => {
                warn!("Failed to parse catalog from {}: {}", self.url, e);
                None
            }
        }
    }

    /// Entry for `song_id`, or `None` when the catalog or the entry is missing.
    pub async fn song(&self, song_id: u32) -> Option<CatalogEntry> {
        self.index().await?.entry(song_id).cloned()
    }

    /// Drops the cached document; the next lookup fetches it again.
    pub async fn reset(&self) {
        *self.cache.lock().await = None;
    }
}
