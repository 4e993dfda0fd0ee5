//! The network fetch capability consumed by the download coordinator
//!
//! HTTP semantics (redirects, headers, retries, timeouts) belong to the
//! implementation behind this trait, not to the cache.

use async_trait::async_trait;
use std::fmt;

/// Bytes and content type returned by a successful fetch
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Error from the network layer. Timeouts, transport failures, and
/// non-success responses all surface here; the cache treats them alike.
#[derive(Debug)]
pub enum FetchError {
    Network(String),
    Status(u16),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Status(code) => write!(f, "Non-success status: {}", code),
        }
    }
}

impl std::error::Error for FetchError {}

/// Retrieves the bytes for a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_display() {
        let err = FetchError::Network("connection refused".to_string());
        assert_eq!(format!("{}", err), "Network error: connection refused");
    }

    #[test]
    fn test_status_error_display() {
        let err = FetchError::Status(404);
        assert_eq!(format!("{}", err), "Non-success status: 404");
    }
}
