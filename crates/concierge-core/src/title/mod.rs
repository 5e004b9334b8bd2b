//! Title caching: key derivation, normalization, and the collapsing LRU cache.

pub mod cache;
pub mod key;

use thiserror::Error;

use concierge_types::error::Interrupted;

pub use cache::{TitleCache, normalize_title};
pub use key::title_cache_key;

/// Title generation failure.
///
/// `Clone` because one failure is handed to every caller collapsed onto the
/// same computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TitleError {
    #[error("title model call failed: {0}")]
    Llm(String),

    #[error("empty response from model for title generation")]
    EmptyResponse,

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}
