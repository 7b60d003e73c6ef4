//! Game session error types.

use super::entities::{CardId, DeckId, ParticipantId, SessionId};
use thiserror::Error;

/// Game session errors
#[derive(Debug, Error)]
pub enum GameError {
    /// Relocation requested for a card that is not in the expected source deck
    #[error("Card {card} not found in {deck}")]
    CardNotFound { card: CardId, deck: DeckId },

    /// Operation requested while the session is in an incompatible state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Impossible state detected; the session must be abandoned
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Participant is not seated at this session
    #[error("Participant {0} is not part of this session")]
    UnknownParticipant(ParticipantId),

    /// Session not found
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GameError {
    /// Get a client-safe error message that doesn't leak storage details.
    pub fn client_message(&self) -> String {
        match self {
            GameError::Database(_) => "Internal server error".to_string(),
            GameError::CardNotFound { .. } | GameError::InvalidState(_) => {
                format!("Move rejected: {self}")
            }
            _ => self.to_string(),
        }
    }

    /// Whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GameError::CardNotFound { .. } | GameError::Database(_))
    }

    /// Whether the session must be abandoned.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::InvariantViolation(_))
    }
}

/// Result type for game session operations
pub type GameResult<T> = Result<T, GameError>;
