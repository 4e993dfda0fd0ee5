//! Cache key derivation

use sha2::{Digest, Sha256};

/// Literal values used upstream as "no image" placeholders
const SENTINELS: [&str; 2] = ["null", "undefined"];

/// Derive the cache key for a source URL.
///
/// The key is the lowercase hex SHA-256 of the UTF-8 URL bytes, safe for
/// filenames and record identifiers. Returns `None` for empty,
/// whitespace-only, or sentinel inputs so callers can short-circuit to a
/// miss without touching storage or the network.
pub fn derive_key(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() || SENTINELS.contains(&trimmed) {
        return None;
    }

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        let url = "https://example.com/avatar.png";
        assert_eq!(derive_key(url), derive_key(url));
    }

    #[test]
    fn test_derive_key_distinct_urls() {
        let a = derive_key("https://example.com/a.png").unwrap();
        let b = derive_key("https://example.com/b.png").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_derive_key_shape() {
        let key = derive_key("https://example.com/logo.svg").unwrap();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_derive_key_identifier_safe() {
        let key = derive_key("https://example.com/a+b/c=d.png").unwrap();
        assert!(!key.contains('/'));
        assert!(!key.contains('+'));
        assert!(!key.contains('='));
    }

    #[test]
    fn test_sentinels_rejected() {
        assert_eq!(derive_key(""), None);
        assert_eq!(derive_key("   "), None);
        assert_eq!(derive_key("null"), None);
        assert_eq!(derive_key("undefined"), None);
        assert_eq!(derive_key(" null "), None);
    }

    #[test]
    fn test_known_digest() {
        // SHA-256 of the ASCII bytes "abc"
        assert_eq!(
            derive_key("abc").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
