//! The public cache facade
//!
//! `ImageCache` composes key derivation, the metadata index, the blob
//! store, and the download coordinator. `resolve` never errors on a miss
//! or a fetch failure; every failure mode degrades to `None` and the
//! caller falls back to the original URL or a placeholder.

use crate::blob::{BlobStore, FsBlobStore, PassthroughBlobStore};
use crate::coordinator::DownloadCoordinator;
use crate::error::Result;
use crate::evict::EvictionPolicy;
use crate::fetch::Fetcher;
use crate::index::CacheIndex;
use crate::key::derive_key;
use crate::types::{CacheConfig, CacheEntry, CacheStats};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

const BLOB_DIR: &str = "blobs";
const INDEX_FILE: &str = "index.json";

pub struct ImageCache {
    config: CacheConfig,
    index: Arc<CacheIndex>,
    blobs: Arc<dyn BlobStore>,
    coordinator: DownloadCoordinator,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ImageCache {
    /// Build a cache from a validated configuration. The blob store is
    /// selected once here: filesystem-backed when a cache directory is
    /// configured, passthrough otherwise.
    pub fn new(config: CacheConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;

        let (blobs, snapshot_path): (Arc<dyn BlobStore>, Option<PathBuf>) = match &config.cache_dir
        {
            Some(dir) => (
                Arc::new(FsBlobStore::new(dir.join(BLOB_DIR))),
                Some(dir.join(INDEX_FILE)),
            ),
            None => (Arc::new(PassthroughBlobStore), None),
        };

        let index = Arc::new(CacheIndex::new(snapshot_path));
        let eviction = EvictionPolicy::new(config.max_budget_bytes, config.low_water_ratio);
        let coordinator = DownloadCoordinator::new(
            fetcher,
            Arc::clone(&blobs),
            Arc::clone(&index),
            eviction,
            config.ttl_secs,
            config.max_concurrent_downloads,
        );

        Ok(Self {
            config,
            index,
            blobs,
            coordinator,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Create the cache directory and load the persisted index
    pub async fn init(&self) -> Result<()> {
        if let Some(dir) = &self.config.cache_dir {
            fs::create_dir_all(dir.join(BLOB_DIR)).await?;
        }
        self.index.load().await?;
        info!(
            entries = self.index.entry_count().await,
            total_size_bytes = self.index.total_size().await,
            "Image cache initialized"
        );
        Ok(())
    }

    /// Resolve a URL to a cached entry, downloading on a miss.
    ///
    /// Returns `None` for sentinel URLs, expired-and-failed refetches,
    /// and any fetch or store failure.
    pub async fn resolve(&self, url: &str) -> Option<CacheEntry> {
        let Some(key) = derive_key(url) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let now = Utc::now();
        if let Some(entry) = self.index.get(&key).await {
            if entry.is_expired(now) {
                debug!(key = %key, "Entry expired on lookup, refetching");
                self.remove_entry(&entry).await;
            } else if !self.blobs.exists(&entry.storage_ref).await {
                // Metadata pointing at a missing blob self-heals to a miss
                warn!(key = %key, storage_ref = %entry.storage_ref, "Blob missing for cached entry, purging");
                if let Err(e) = self.index.remove(&key).await {
                    warn!(key = %key, error = %e, "Failed to purge stale entry");
                }
            } else {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        self.coordinator.download(&key, url).await
    }

    /// Evict every entry unconditionally. Idempotent; blob deletes are
    /// best-effort.
    pub async fn clear(&self) -> Result<()> {
        let drained = self.index.clear().await?;
        for entry in &drained {
            if let Err(e) = self.blobs.delete(&entry.storage_ref).await {
                warn!(key = %entry.key, error = %e, "Failed to delete blob during clear");
            }
        }
        info!(removed = drained.len(), "Cache cleared");
        Ok(())
    }

    /// Read-only snapshot for diagnostics
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.index.entry_count().await,
            total_size_bytes: self.index.total_size().await,
            max_budget_bytes: self.config.max_budget_bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    async fn remove_entry(&self, entry: &CacheEntry) {
        if let Err(e) = self.blobs.delete(&entry.storage_ref).await {
            warn!(key = %entry.key, error = %e, "Failed to delete expired blob");
        }
        if let Err(e) = self.index.remove(&entry.key).await {
            warn!(key = %entry.key, error = %e, "Failed to remove expired entry");
        }
    }
}
