//! Disk-backed image cache with TTL expiration and size-bounded eviction
//!
//! Caches remotely-fetched images (avatars, logos) on local disk with a
//! durable metadata index, oldest-first eviction under a size budget, and
//! coalescing of concurrent downloads for the same URL. On platforms
//! without local file access the cache degrades to pure metadata
//! bookkeeping via a passthrough blob store.

mod blob;
mod cache;
mod coordinator;
mod error;
mod evict;
mod fetch;
mod index;
mod key;
mod types;

pub use blob::{BlobStore, FsBlobStore, PassthroughBlobStore, WrittenBlob};
pub use cache::ImageCache;
pub use error::{CacheError, Result};
pub use fetch::{FetchError, FetchedImage, Fetcher};
pub use key::derive_key;
pub use types::{CacheConfig, CacheEntry, CacheStats};
