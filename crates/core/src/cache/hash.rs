//! Cache key generation.

use sha2::{Digest, Sha256};

/// Compute the entry key for a request URL.
///
/// The URL should already be canonical so that equivalent spellings of the
/// same request share one entry.
pub fn compute_cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"GET\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("http://localhost:8080/index.html");
        let hash2 = compute_cache_key("http://localhost:8080/index.html");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_query_is_significant() {
        let plain = compute_cache_key("http://localhost:8080/page");
        let with_query = compute_cache_key("http://localhost:8080/page?v=2");
        assert_ne!(plain, with_query);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("http://localhost:8080/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
