//! Deck management: the storage contract and the per-session deck store.
//!
//! This module implements:
//! - `DeckRepository`: async storage contract (get/move/query over
//!   card-to-deck associations)
//! - `MemoryDeckRepository` and `PgDeckRepository` implementations
//! - `DeckStore`: dealing, atomic relocation, randomized draws, resets and
//!   discard drains for one session
//!
//! ## Example
//!
//! ```
//! use speed_war::deck::{DeckStore, MemoryDeckRepository};
//! use speed_war::game::{ParticipantId, Seat, SessionId};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = Arc::new(MemoryDeckRepository::new());
//!     let mut store =
//!         DeckStore::open(SessionId(1), repo, ParticipantId(10), ParticipantId(2), None).await?;
//!
//!     store.deal_session().await?;
//!     let next = store.top_of_play(Seat::Human).await?;
//!     assert!(next.is_some());
//!     Ok(())
//! }
//! ```

pub mod postgres;
pub mod repository;
pub mod store;

pub use postgres::PgDeckRepository;
pub use repository::{DeckRepository, MemoryDeckRepository};
pub use store::{DeckCounts, DeckStore, SeatCounts};

#[cfg(test)]
pub(crate) mod testing;
