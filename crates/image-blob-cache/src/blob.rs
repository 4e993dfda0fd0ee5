//! Blob storage capabilities
//!
//! `FsBlobStore` keeps blobs under a cache directory using a
//! write-to-temp-then-rename protocol, so an interrupted write is never
//! visible under the final name. `PassthroughBlobStore` stores nothing
//! and hands back the source URL as the storage reference; platforms
//! without local file access degrade to metadata-only bookkeeping.

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Result of a successful blob write
#[derive(Debug, Clone)]
pub struct WrittenBlob {
    pub storage_ref: String,
    pub size_bytes: u64,
}

/// Stores and retrieves named blobs for the cache
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn write(&self, key: &str, source_url: &str, bytes: &[u8]) -> Result<WrittenBlob>;
    async fn read(&self, storage_ref: &str) -> Result<Vec<u8>>;
    async fn delete(&self, storage_ref: &str) -> Result<()>;
    async fn exists(&self, storage_ref: &str) -> bool;
}

/// Filesystem-backed blob store
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the blob directory if it does not exist
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn write(&self, key: &str, _source_url: &str, bytes: &[u8]) -> Result<WrittenBlob> {
        let path = self.blob_path(key);
        let tmp = self.root.join(format!("{}.tmp", key));

        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;

        let size_bytes = bytes.len() as u64;
        debug!(key, size_bytes, "Wrote blob");

        Ok(WrittenBlob {
            storage_ref: path.to_string_lossy().into_owned(),
            size_bytes,
        })
    }

    async fn read(&self, storage_ref: &str) -> Result<Vec<u8>> {
        Ok(fs::read(storage_ref).await?)
    }

    async fn delete(&self, storage_ref: &str) -> Result<()> {
        fs::remove_file(storage_ref).await?;
        Ok(())
    }

    async fn exists(&self, storage_ref: &str) -> bool {
        fs::try_exists(storage_ref).await.unwrap_or(false)
    }
}

/// Blob store for platforms without local file access
///
/// Writes store nothing and report the source URL as the reference with
/// a size of zero (size unknown, not empty). Every reference with
/// metadata is considered present.
pub struct PassthroughBlobStore;

#[async_trait]
impl BlobStore for PassthroughBlobStore {
    async fn write(&self, _key: &str, source_url: &str, _bytes: &[u8]) -> Result<WrittenBlob> {
        Ok(WrittenBlob {
            storage_ref: source_url.to_string(),
            size_bytes: 0,
        })
    }

    async fn read(&self, storage_ref: &str) -> Result<Vec<u8>> {
        Err(CacheError::Store(format!(
            "passthrough store holds no bytes for {}",
            storage_ref
        )))
    }

    async fn delete(&self, _storage_ref: &str) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, _storage_ref: &str) -> bool {
        true
    }
}
