//! Error types for the image blob cache

use crate::fetch::FetchError;
use std::fmt;

#[derive(Debug)]
pub enum CacheError {
    Config(String),
    Store(String),
    Fetch(FetchError),
    Io(Box<std::io::Error>),
    Serialize(Box<serde_json::Error>),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CacheError::Store(msg) => write!(f, "Store error: {}", msg),
            CacheError::Fetch(err) => write!(f, "Fetch error: {}", err),
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::Serialize(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Fetch(err) => Some(err),
            CacheError::Io(err) => Some(err.as_ref()),
            CacheError::Serialize(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialize(Box::new(err))
    }
}

impl From<FetchError> for CacheError {
    fn from(err: FetchError) -> Self {
        CacheError::Fetch(err)
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = CacheError::Config("max_budget_bytes must be positive".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: max_budget_bytes must be positive"
        );
    }

    #[test]
    fn test_store_error_display() {
        let err = CacheError::Store("disk full".to_string());
        assert_eq!(format!("{}", err), "Store error: disk full");
    }

    #[test]
    fn test_fetch_error_display() {
        let err = CacheError::Fetch(FetchError::Status(404));
        assert!(format!("{}", err).contains("404"));
    }

    #[test]
    fn test_io_error_has_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = CacheError::from(io);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_is_debug() {
        let err = CacheError::Store("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Store"));
    }
}
