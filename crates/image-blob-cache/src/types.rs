//! Cache types and configuration

use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata for a cached image entry
///
/// Entries are immutable: a re-fetch of the same URL inserts a
/// replacement entry rather than mutating this one in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache key derived from the source URL
    pub key: String,
    /// Original URL, retained for re-validation and debugging
    pub source_url: String,
    /// Opaque locator the blob store understands (a path for the
    /// filesystem store, the URL itself in passthrough mode)
    pub storage_ref: String,
    pub content_type: String,
    /// Size reported by the blob store at write time. `0` is a valid
    /// value on platforms that cannot report size and never signals
    /// corruption on its own.
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether the entry has passed its TTL at the given instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size_bytes: u64,
    pub max_budget_bytes: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Configuration for the image cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory for cached blobs and the index snapshot. `None` selects
    /// the passthrough store on platforms without local file access.
    pub cache_dir: Option<PathBuf>,
    pub max_budget_bytes: u64,
    pub ttl_secs: u64,
    pub max_concurrent_downloads: usize,
    /// Eviction hysteresis: a size sweep stops once the total size drops
    /// to `max_budget_bytes * low_water_ratio`.
    pub low_water_ratio: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: Some(PathBuf::from("./cache/images")),
            max_budget_bytes: 256 * 1024 * 1024, // 256 MB
            ttl_secs: 24 * 60 * 60,              // 24 hours
            max_concurrent_downloads: 4,
            low_water_ratio: 0.8,
        }
    }
}

impl CacheConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache_dir = std::env::var("CACHE_DIR")
            .map(PathBuf::from)
            .ok()
            .or(defaults.cache_dir);

        let max_budget_bytes = std::env::var("MAX_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.max_budget_bytes);

        let ttl_secs = std::env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.ttl_secs);

        let max_concurrent_downloads = std::env::var("MAX_CONCURRENT_DOWNLOADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_concurrent_downloads);

        let low_water_ratio = std::env::var("CACHE_LOW_WATER")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(defaults.low_water_ratio);

        Self {
            cache_dir,
            max_budget_bytes,
            ttl_secs,
            max_concurrent_downloads,
            low_water_ratio,
        }
    }

    /// Reject configurations the cache cannot run with. Misconfiguration
    /// is fatal at initialization, unlike runtime failures which degrade
    /// to cache misses.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_budget_bytes == 0 {
            return Err(CacheError::Config(
                "max_budget_bytes must be positive".to_string(),
            ));
        }
        if self.ttl_secs == 0 {
            return Err(CacheError::Config("ttl_secs must be positive".to_string()));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(CacheError::Config(
                "max_concurrent_downloads must be positive".to_string(),
            ));
        }
        if !(self.low_water_ratio > 0.0 && self.low_water_ratio <= 1.0) {
            return Err(CacheError::Config(format!(
                "low_water_ratio must be in (0, 1], got {}",
                self.low_water_ratio
            )));
        }
        Ok(())
    }
}
