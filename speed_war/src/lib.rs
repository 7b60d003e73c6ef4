//! # Speed War
//!
//! A two-participant speed card-matching game ("War" with a timed slap)
//! between a human player and an automated opponent.
//!
//! The interesting part is the turn coordination: the human's moves arrive
//! as external requests, while the automated participant runs its own
//! self-pacing loop that has to race against, yield to and be cancelled by
//! those requests without corrupting the shared deck state.
//!
//! ## Session lifecycle
//!
//! - **Idle**: session opened, nothing dealt
//! - **HumanTurn**: the human may flip
//! - **AutomatedTurn**: the automated loop flips at a fixed pace
//! - **SlapWindow**: a matching pair is exposed; the loop holds off for the
//!   grace window
//! - **GameOver**: one participant ran out of cards
//! - **Abandoned**: an inconsistency was detected; a fresh deal is required
//!
//! ## Core Modules
//!
//! - [`game`]: cards, decks, participants and the error taxonomy
//! - [`deck`]: the deck store and its storage repositories
//! - [`session`]: turn coordinator, slap resolution, win detection, events
//! - [`db`]: PostgreSQL connection pooling
//!
//! ## Example
//!
//! ```
//! use speed_war::{MemoryDeckRepository, ParticipantId, SessionConfig, SessionManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = SessionManager::new(
//!         Arc::new(MemoryDeckRepository::new()),
//!         SessionConfig::default(),
//!     );
//!
//!     let id = manager.create_session(ParticipantId(42), "alice").await?;
//!     let session = manager.get_session(id).await?;
//!     session.deal().await?;
//!     session.request_flip(ParticipantId(42)).await?;
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```

/// PostgreSQL connection pooling.
pub mod db;

/// Deck store and deck repositories.
pub mod deck;
pub use deck::{DeckCounts, DeckRepository, DeckStore, MemoryDeckRepository, PgDeckRepository};

/// Cards, decks, participants and errors.
pub mod game;
pub use game::{
    Card, CardFace, CardId, DeckRole, GameError, GameResult, Participant, ParticipantId, Seat,
    SessionId, Suit,
};

/// Turn coordination and session management.
pub mod session;
pub use session::{
    ChannelBroadcaster, EventBroadcaster, FlipOutcome, GameSpeed, Phase, Session, SessionConfig,
    SessionEvent, SessionManager, SessionView, SlapVerdict,
};
