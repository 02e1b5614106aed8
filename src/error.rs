//! Error types for the vocabulary engine.
//!
//! Input noise never produces an error; only identity lookups, storage
//! failures and configuration problems do.

use thiserror::Error;

use crate::model::{BookId, LearnerId, WordId};

/// Errors raised by a persistence backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// A word row already exists for this learner (uniqueness on learner + word)
    #[error("Word '{word}' already exists for learner {learner_id}")]
    DuplicateWord { learner_id: LearnerId, word: String },

    /// A row to update does not exist
    #[error("Row not found: {0}")]
    Missing(String),

    /// Backend failure (connection, I/O, serialization)
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Unified engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Learner not found: {0}")]
    LearnerNotFound(LearnerId),

    #[error("Book not found: {0}")]
    BookNotFound(BookId),

    #[error("Word not found: {0}")]
    WordNotFound(WordId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background statistics worker has shut down
    #[error("Statistics resync worker is not running")]
    ResyncUnavailable,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Whether this is a caller-level not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::LearnerNotFound(_) | Self::BookNotFound(_) | Self::WordNotFound(_)
        )
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
