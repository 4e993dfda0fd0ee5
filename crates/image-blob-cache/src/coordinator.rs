//! Download coordination
//!
//! De-duplicates concurrent fetches for the same key and bounds the
//! number of fetches in flight across all keys. The download itself runs
//! in a spawned task, so a caller that abandons interest never cancels a
//! fetch other callers are attached to; the result still lands in the
//! cache for future lookups.

use crate::blob::BlobStore;
use crate::error::{CacheError, Result};
use crate::evict::EvictionPolicy;
use crate::fetch::Fetcher;
use crate::index::CacheIndex;
use crate::types::CacheEntry;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, Semaphore};
use tracing::{debug, warn};

/// `None` is the miss signal callers fall back from
type DownloadResult = Option<CacheEntry>;

pub struct DownloadCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    fetcher: Arc<dyn Fetcher>,
    blobs: Arc<dyn BlobStore>,
    index: Arc<CacheIndex>,
    eviction: EvictionPolicy,
    ttl_secs: u64,
    slots: Semaphore,
    in_flight: Mutex<HashMap<String, broadcast::Sender<DownloadResult>>>,
}

impl DownloadCoordinator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        blobs: Arc<dyn BlobStore>,
        index: Arc<CacheIndex>,
        eviction: EvictionPolicy,
        ttl_secs: u64,
        max_concurrent_downloads: usize,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                fetcher,
                blobs,
                index,
                eviction,
                ttl_secs,
                slots: Semaphore::new(max_concurrent_downloads),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Resolve a cache miss for `key`, coalescing with any download
    /// already in flight for it
    pub async fn download(&self, key: &str, url: &str) -> DownloadResult {
        let mut rx = {
            let mut in_flight = self.inner.in_flight.lock().await;
            match in_flight.get(key) {
                Some(tx) => {
                    debug!(key, "Attaching to in-flight download");
                    tx.subscribe()
                }
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    in_flight.insert(key.to_string(), tx);

                    let inner = Arc::clone(&self.inner);
                    let key = key.to_string();
                    let url = url.to_string();
                    tokio::spawn(async move { inner.run_download(&key, &url).await });
                    rx
                }
            }
        };

        // A dropped sender (task panic) reads as a miss
        rx.recv().await.unwrap_or_default()
    }
}

impl CoordinatorInner {
    async fn run_download(&self, key: &str, url: &str) {
        let result = match self.fetch_and_store(key, url).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key, url, error = %e, "Download failed");
                None
            }
        };

        // Remove from the in-flight set before releasing waiters so a
        // retry arriving after the result starts a fresh download.
        let tx = self.in_flight.lock().await.remove(key);
        if let Some(tx) = tx {
            let _ = tx.send(result);
        }
    }

    async fn fetch_and_store(&self, key: &str, url: &str) -> Result<CacheEntry> {
        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| CacheError::Store("download slots closed".to_string()))?;

        let fetched = self.fetcher.fetch(url).await?;
        let written = self.blobs.write(key, url, &fetched.bytes).await?;

        let now = Utc::now();
        let entry = CacheEntry {
            key: key.to_string(),
            source_url: url.to_string(),
            storage_ref: written.storage_ref,
            content_type: fetched.content_type,
            size_bytes: written.size_bytes,
            created_at: now,
            expires_at: now + Duration::seconds(self.ttl_secs as i64),
        };

        if let Err(e) = self.index.insert(entry.clone()).await {
            // The blob must not stay reachable-looking when the metadata
            // write failed; without a record it is already unreachable,
            // so the delete is cleanup, not correctness.
            if let Err(del) = self.blobs.delete(&entry.storage_ref).await {
                warn!(key, error = %del, "Failed to delete blob after metadata write failure");
            }
            return Err(e);
        }

        debug!(key, size_bytes = entry.size_bytes, "Cached downloaded image");
        self.eviction.sweep(&self.index, self.blobs.as_ref(), now).await;
        Ok(entry)
    }
}
