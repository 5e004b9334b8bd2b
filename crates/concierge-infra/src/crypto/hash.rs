//! SHA-256 content hashing for title cache keys.
//!
//! Implements the `ContentHasher` trait from `concierge-core` using the
//! `sha2` crate (RustCrypto ecosystem).

use sha2::{Digest, Sha256};

use concierge_core::hash::ContentHasher;

/// SHA-256 implementation of `ContentHasher`.
///
/// Produces lowercase hex digests, so keys are fixed-length no matter how
/// long the opening message is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256ContentHasher;

impl Sha256ContentHasher {
    pub fn new() -> Self {
        Self
    }
}

impl ContentHasher for Sha256ContentHasher {
    fn compute_hash(&self, content: &str) -> String {
        let digest = Sha256::digest(content.as_bytes());
        format!("{:x}", digest)
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::title::title_cache_key;

    use super::*;

    #[test]
    fn known_value_for_empty_input() {
        let hasher = Sha256ContentHasher::new();
        assert_eq!(
            hasher.compute_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let hash = Sha256ContentHasher::new().compute_hash("Weather in Barcelona");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn title_keys_ignore_case_and_spacing_of_the_opening() {
        let hasher = Sha256ContentHasher::new();
        let a = title_cache_key(&hasher, "o1", "v1", "What is the weather in  Barcelona?");
        let b = title_cache_key(&hasher, "o1", "v1", "what is the WEATHER in Barcelona?");
        let c = title_cache_key(&hasher, "o1", "v2", "what is the weather in barcelona?");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
