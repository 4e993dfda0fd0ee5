//! HTTP Image Fetcher
//!
//! `reqwest`-backed implementation of the cache's `Fetcher` capability.
//! Owns all HTTP semantics (timeouts, status handling); the cache only
//! sees bytes or a `FetchError`.

mod fetcher;

pub use fetcher::HttpImageFetcher;
