use thiserror::Error;

use crate::store::{CompetitionId, EventId, EventTypeId, RoundId, StoreError};

/// Structural failures. These abort the operation that hit them and carry no
/// partial result; configuration gaps and per-record failures never end up here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("round {0} not found")]
    RoundNotFound(RoundId),

    #[error("event {0} not found")]
    EventNotFound(EventId),

    #[error("competition {0} not found")]
    CompetitionNotFound(CompetitionId),

    #[error("round {0} has no competitors")]
    NoCompetitors(RoundId),

    #[error("no tier thresholds configured for event type {0}")]
    NoThresholds(EventTypeId),

    #[error("event type {0} has no D tier to fall back to")]
    MissingFallbackTier(EventTypeId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
