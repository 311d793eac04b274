use thiserror::Error;

/// Errors surfaced by a [`ScoringStore`](super::ScoringStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// The backing store could not be reached or is in a bad state.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write (constraint violation, duplicate key, ...).
    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
