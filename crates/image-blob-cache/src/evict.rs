//! Expiry and size-budget eviction
//!
//! A sweep runs synchronously after every successful insert. The expiry
//! sweep is unconditional; the size sweep evicts oldest-first until the
//! total drops to the low-water mark, so inserts near the budget
//! boundary do not thrash the cache.

use crate::blob::BlobStore;
use crate::index::CacheIndex;
use crate::types::CacheEntry;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

pub struct EvictionPolicy {
    max_budget_bytes: u64,
    low_water_bytes: u64,
}

impl EvictionPolicy {
    pub fn new(max_budget_bytes: u64, low_water_ratio: f64) -> Self {
        let low_water_bytes = (max_budget_bytes as f64 * low_water_ratio) as u64;
        Self {
            max_budget_bytes,
            low_water_bytes,
        }
    }

    /// Remove every expired entry, then evict oldest-first while the
    /// total size exceeds the budget
    pub async fn sweep(&self, index: &CacheIndex, blobs: &dyn BlobStore, now: DateTime<Utc>) {
        for entry in index.snapshot().await {
            if entry.is_expired(now) {
                self.evict(index, blobs, &entry, "expired").await;
            }
        }

        if index.total_size().await <= self.max_budget_bytes {
            return;
        }

        for entry in index.snapshot().await {
            if index.total_size().await <= self.low_water_bytes {
                break;
            }
            self.evict(index, blobs, &entry, "over budget").await;
        }
    }

    /// Delete the blob (best-effort), then the metadata record. A failed
    /// blob delete leaves an orphan that no key lookup can reach; it is
    /// overwritten on the next fetch of the same URL.
    async fn evict(
        &self,
        index: &CacheIndex,
        blobs: &dyn BlobStore,
        entry: &CacheEntry,
        reason: &str,
    ) {
        if let Err(e) = blobs.delete(&entry.storage_ref).await {
            warn!(key = %entry.key, error = %e, "Failed to delete blob during eviction");
        }
        match index.remove(&entry.key).await {
            Ok(_) => {
                debug!(key = %entry.key, size_bytes = entry.size_bytes, reason, "Evicted cache entry")
            }
            Err(e) => warn!(key = %entry.key, error = %e, "Failed to remove metadata during eviction"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CacheError, Result};
    use crate::blob::WrittenBlob;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Blob store that records deletes and optionally fails them
    struct RecordingBlobStore {
        deletes: AtomicUsize,
        fail_deletes: bool,
    }

    impl RecordingBlobStore {
        fn new(fail_deletes: bool) -> Self {
            Self {
                deletes: AtomicUsize::new(0),
                fail_deletes,
            }
        }
    }

    #[async_trait]
    impl BlobStore for RecordingBlobStore {
        async fn write(&self, _key: &str, source_url: &str, bytes: &[u8]) -> Result<WrittenBlob> {
            Ok(WrittenBlob {
                storage_ref: source_url.to_string(),
                size_bytes: bytes.len() as u64,
            })
        }

        async fn read(&self, _storage_ref: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _storage_ref: &str) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            if self.fail_deletes {
                Err(CacheError::Store("delete refused".to_string()))
            } else {
                Ok(())
            }
        }

        async fn exists(&self, _storage_ref: &str) -> bool {
            true
        }
    }

    fn entry_at(key: &str, size_bytes: u64, created_at: DateTime<Utc>, ttl_secs: i64) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            source_url: format!("https://example.com/{}.png", key),
            storage_ref: format!("/blobs/{}", key),
            content_type: "image/png".to_string(),
            size_bytes,
            created_at,
            expires_at: created_at + Duration::seconds(ttl_secs),
        }
    }

    #[tokio::test]
    async fn test_expiry_sweep_removes_only_expired() {
        let index = CacheIndex::new(None);
        let blobs = RecordingBlobStore::new(false);
        let now = Utc::now();

        index
            .insert(entry_at("stale", 10, now - Duration::seconds(120), 60))
            .await
            .unwrap();
        index
            .insert(entry_at("fresh", 10, now, 60))
            .await
            .unwrap();

        let policy = EvictionPolicy::new(1000, 0.8);
        policy.sweep(&index, &blobs, now).await;

        assert!(index.get("stale").await.is_none());
        assert!(index.get("fresh").await.is_some());
        assert_eq!(blobs.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_size_sweep_evicts_oldest_to_low_water() {
        let index = CacheIndex::new(None);
        let blobs = RecordingBlobStore::new(false);
        let now = Utc::now();

        // Budget 100, low water 80: inserting 40+40+40 must evict the
        // oldest entry and leave the two most recent.
        for (key, age_secs) in [("first", 30i64), ("second", 20), ("third", 10)] {
            index
                .insert(entry_at(key, 40, now - Duration::seconds(age_secs), 3600))
                .await
                .unwrap();
        }

        let policy = EvictionPolicy::new(100, 0.8);
        policy.sweep(&index, &blobs, now).await;

        assert!(index.get("first").await.is_none());
        assert!(index.get("second").await.is_some());
        assert!(index.get("third").await.is_some());
        assert_eq!(index.total_size().await, 80);
    }

    #[tokio::test]
    async fn test_size_sweep_skipped_under_budget() {
        let index = CacheIndex::new(None);
        let blobs = RecordingBlobStore::new(false);
        let now = Utc::now();

        index.insert(entry_at("a", 50, now, 3600)).await.unwrap();

        let policy = EvictionPolicy::new(100, 0.8);
        policy.sweep(&index, &blobs, now).await;

        assert_eq!(index.entry_count().await, 1);
        assert_eq!(blobs.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_blob_delete_does_not_resurrect_metadata() {
        let index = CacheIndex::new(None);
        let blobs = RecordingBlobStore::new(true);
        let now = Utc::now();

        index
            .insert(entry_at("stale", 10, now - Duration::seconds(120), 60))
            .await
            .unwrap();
        index
            .insert(entry_at("bulky", 200, now - Duration::seconds(30), 3600))
            .await
            .unwrap();
        index
            .insert(entry_at("fresh", 10, now, 3600))
            .await
            .unwrap();

        let policy = EvictionPolicy::new(100, 0.8);
        policy.sweep(&index, &blobs, now).await;

        // Delete failures are logged and ignored; the sweep still runs
        // to completion and the entries are gone from the index.
        assert!(index.get("stale").await.is_none());
        assert!(index.get("bulky").await.is_none());
        assert!(index.get("fresh").await.is_some());
        assert!(index.total_size().await <= 80);
    }
}
