//! Durable metadata index
//!
//! The in-memory map is the cache of record; the JSON snapshot on disk
//! is its recovery form, rewritten atomically after every mutation.
//! With no snapshot path (passthrough platforms) the index is
//! memory-only and mutations skip persistence.

use crate::error::Result;
use crate::types::CacheEntry;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

struct IndexState {
    entries: HashMap<String, CacheEntry>,
    total_size: u64,
}

/// Index of `key -> CacheEntry`, the single source of truth for what the
/// cache believes is cached
pub struct CacheIndex {
    snapshot_path: Option<PathBuf>,
    state: RwLock<IndexState>,
}

impl CacheIndex {
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        Self {
            snapshot_path,
            state: RwLock::new(IndexState {
                entries: HashMap::new(),
                total_size: 0,
            }),
        }
    }

    /// Load the persisted snapshot, if any. An unreadable snapshot is
    /// discarded and the cache starts empty; an interrupted write is a
    /// miss, not a corruption.
    pub async fn load(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let entries: HashMap<String, CacheEntry> = match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Discarding unreadable index snapshot");
                HashMap::new()
            }
        };

        let total_size = entries.values().map(|e| e.size_bytes).sum();
        let mut state = self.state.write().await;
        state.entries = entries;
        state.total_size = total_size;
        debug!(
            entries = state.entries.len(),
            total_size = state.total_size,
            "Loaded cache index"
        );
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.state.read().await.entries.get(key).cloned()
    }

    /// Insert an entry and persist the index. On a persist failure the
    /// in-memory view is rolled back so memory and disk stay in step.
    pub async fn insert(&self, entry: CacheEntry) -> Result<()> {
        let mut state = self.state.write().await;

        let previous = state.entries.insert(entry.key.clone(), entry.clone());
        if let Some(old) = &previous {
            state.total_size = state.total_size.saturating_sub(old.size_bytes);
        }
        state.total_size += entry.size_bytes;

        if let Err(e) = self.persist(&state.entries).await {
            state.total_size = state.total_size.saturating_sub(entry.size_bytes);
            match previous {
                Some(old) => {
                    state.total_size += old.size_bytes;
                    state.entries.insert(entry.key.clone(), old);
                }
                None => {
                    state.entries.remove(&entry.key);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Remove an entry and persist the index
    pub async fn remove(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut state = self.state.write().await;

        let Some(removed) = state.entries.remove(key) else {
            return Ok(None);
        };
        state.total_size = state.total_size.saturating_sub(removed.size_bytes);

        if let Err(e) = self.persist(&state.entries).await {
            state.total_size += removed.size_bytes;
            state.entries.insert(removed.key.clone(), removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    /// All entries ordered oldest-first, ties broken by key, for a
    /// deterministic eviction pass
    pub async fn snapshot(&self) -> Vec<CacheEntry> {
        let state = self.state.read().await;
        let mut entries: Vec<CacheEntry> = state.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.key.cmp(&b.key))
        });
        entries
    }

    pub async fn total_size(&self) -> u64 {
        self.state.read().await.total_size
    }

    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Drop every entry, persist the empty index, and return what was
    /// removed so callers can clean up blobs
    pub async fn clear(&self) -> Result<Vec<CacheEntry>> {
        let mut state = self.state.write().await;

        let drained: Vec<CacheEntry> = state.entries.drain().map(|(_, e)| e).collect();
        state.total_size = 0;

        self.persist(&state.entries).await?;
        Ok(drained)
    }

    async fn persist(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let json = serde_json::to_vec(entries)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}
