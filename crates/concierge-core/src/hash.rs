//! ContentHasher trait for deriving fixed-length digests.
//!
//! Defined in concierge-core so the title cache can derive keys without
//! coupling to a specific hashing algorithm. The `Sha256ContentHasher` adapter
//! lives in concierge-infra.

/// Abstraction over content hashing.
///
/// Used by the title cache to turn an arbitrarily long key source into a
/// fixed-length key.
pub trait ContentHasher: Send + Sync {
    /// Compute a hex-encoded hash of the given content.
    fn compute_hash(&self, content: &str) -> String;
}
