use thiserror::Error;

/// Errors from repository operations (used by trait definitions in concierge-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Why a piece of work stopped before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Errors surfaced by conversation operations to their callers.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("conversation not found")]
    NotFound,

    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl ChatError {
    /// True for errors raised before any side effect took place.
    pub fn is_validation(&self) -> bool {
        matches!(self, ChatError::MissingArgument(_) | ChatError::Validation(_))
    }
}
