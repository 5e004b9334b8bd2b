//! Cache keys for generated titles.

use crate::hash::ContentHasher;

/// Lowercase, trim, and collapse internal whitespace to single spaces.
pub fn normalize_for_key(message: &str) -> String {
    message
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Fixed-length key for the title of a conversation opening with `first_message`.
///
/// Model and prompt version are part of the key, so changing either one
/// stops old entries from matching.
pub fn title_cache_key(
    hasher: &dyn ContentHasher,
    model: &str,
    prompt_version: &str,
    first_message: &str,
) -> String {
    let raw = format!(
        "title|{model}|{prompt_version}|{}",
        normalize_for_key(first_message)
    );
    hasher.compute_hash(&raw)
}
