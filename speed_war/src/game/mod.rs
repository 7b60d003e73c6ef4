//! Card and deck data model shared by every part of the engine.
//!
//! This module provides:
//! - Cards, suits, ranks and the two placeholder cards
//! - Deck, deck role and card-to-deck association records
//! - Participants, seats and the exposed pair
//! - The error taxonomy for session operations

pub mod entities;
pub mod errors;

pub use entities::{
    Card, CardFace, CardId, DEFAULT_AUTOMATED_ID, DISCARD_OWNER, Deck, DeckCard, DeckId,
    DeckRole, ExposedPair, NEWEST_SENTINEL, PREVIOUS_SENTINEL, Participant, ParticipantId,
    ParticipantRole, Rank, STANDARD_DECK_SIZE, Seat, SessionId, Suit, standard_cards,
};
pub use errors::{GameError, GameResult};
