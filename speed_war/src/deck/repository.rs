//! Deck repository trait definitions for storage independence and testability.
//!
//! The engine treats storage purely as a relocation surface over
//! card-to-deck associations. Any backend must make `relocate` a single
//! atomic step so readers never see a card in zero or two decks.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::game::{
    Card, CardId, Deck, DeckCard, DeckId, DeckRole, GameError, GameResult, ParticipantId,
    SessionId, standard_cards,
};

/// Trait for card-to-deck storage operations
#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Load every card record, placeholders included
    async fn load_cards(&self) -> GameResult<Vec<Card>>;

    /// Get or create the deck with the given owner and role for a session
    async fn ensure_deck(
        &self,
        session: SessionId,
        owner: ParticipantId,
        role: DeckRole,
    ) -> GameResult<Deck>;

    /// List the cards currently held by a deck
    async fn deck_cards(&self, deck: DeckId) -> GameResult<Vec<CardId>>;

    /// Place a card that is not yet held by any deck of the session
    async fn place_card(&self, session: SessionId, card: CardId, deck: DeckId) -> GameResult<()>;

    /// Atomically move a card between decks.
    ///
    /// Returns `false` (and changes nothing) if the card is not in `from`.
    async fn relocate(
        &self,
        session: SessionId,
        card: CardId,
        from: DeckId,
        to: DeckId,
    ) -> GameResult<bool>;

    /// Remove every card from a deck, returning how many were removed
    async fn clear_deck(&self, deck: DeckId) -> GameResult<u64>;

    /// List every card-to-deck association of a session
    async fn assignments(&self, session: SessionId) -> GameResult<Vec<DeckCard>>;

    /// Forget a finished session: its decks and every card placed in them.
    ///
    /// Returns the number of card placements released.
    async fn drop_session(&self, session: SessionId) -> GameResult<u64>;
}

#[derive(Default)]
struct MemoryTables {
    cards: Vec<Card>,
    decks: HashMap<DeckId, Deck>,
    next_deck_id: i64,
    /// session -> card -> holding deck
    placements: HashMap<SessionId, HashMap<CardId, DeckId>>,
}

/// In-process implementation of `DeckRepository`.
///
/// All tables sit behind one lock, so every call is a single transaction.
pub struct MemoryDeckRepository {
    tables: Mutex<MemoryTables>,
}

impl Default for MemoryDeckRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDeckRepository {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(MemoryTables {
                cards: standard_cards(),
                next_deck_id: 1,
                ..Default::default()
            }),
        }
    }

    fn tables(&self) -> GameResult<MutexGuard<'_, MemoryTables>> {
        self.tables
            .lock()
            .map_err(|_| GameError::InvariantViolation("deck repository lock poisoned".to_string()))
    }
}

fn session_of(tables: &MemoryTables, deck: DeckId) -> GameResult<SessionId> {
    tables
        .decks
        .get(&deck)
        .map(|d| d.session)
        .ok_or_else(|| GameError::InvalidState(format!("{deck} does not exist")))
}

#[async_trait]
impl DeckRepository for MemoryDeckRepository {
    async fn load_cards(&self) -> GameResult<Vec<Card>> {
        Ok(self.tables()?.cards.clone())
    }

    async fn ensure_deck(
        &self,
        session: SessionId,
        owner: ParticipantId,
        role: DeckRole,
    ) -> GameResult<Deck> {
        let mut tables = self.tables()?;
        if let Some(deck) = tables
            .decks
            .values()
            .find(|d| d.session == session && d.owner == owner && d.role == role)
        {
            return Ok(*deck);
        }

        let deck = Deck {
            id: DeckId(tables.next_deck_id),
            session,
            owner,
            role,
        };
        tables.next_deck_id += 1;
        tables.decks.insert(deck.id, deck);
        Ok(deck)
    }

    async fn deck_cards(&self, deck: DeckId) -> GameResult<Vec<CardId>> {
        let tables = self.tables()?;
        let session = session_of(&tables, deck)?;
        let cards: BTreeSet<CardId> = tables
            .placements
            .get(&session)
            .map(|placed| {
                placed
                    .iter()
                    .filter(|(_, holder)| **holder == deck)
                    .map(|(card, _)| *card)
                    .collect()
            })
            .unwrap_or_default();
        Ok(cards.into_iter().collect())
    }

    async fn place_card(&self, session: SessionId, card: CardId, deck: DeckId) -> GameResult<()> {
        let mut tables = self.tables()?;
        if session_of(&tables, deck)? != session {
            return Err(GameError::InvalidState(format!(
                "{deck} does not belong to session {session}"
            )));
        }

        let placed = tables.placements.entry(session).or_default();
        if let Some(holder) = placed.get(&card) {
            return Err(GameError::InvariantViolation(format!(
                "card {card} already held by {holder}"
            )));
        }
        placed.insert(card, deck);
        Ok(())
    }

    async fn relocate(
        &self,
        session: SessionId,
        card: CardId,
        from: DeckId,
        to: DeckId,
    ) -> GameResult<bool> {
        let mut tables = self.tables()?;
        if session_of(&tables, to)? != session {
            return Err(GameError::InvalidState(format!(
                "{to} does not belong to session {session}"
            )));
        }

        match tables
            .placements
            .get_mut(&session)
            .and_then(|placed| placed.get_mut(&card))
        {
            Some(holder) if *holder == from => {
                *holder = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_deck(&self, deck: DeckId) -> GameResult<u64> {
        let mut tables = self.tables()?;
        let session = session_of(&tables, deck)?;
        let Some(placed) = tables.placements.get_mut(&session) else {
            return Ok(0);
        };

        let before = placed.len();
        placed.retain(|_, holder| *holder != deck);
        Ok((before - placed.len()) as u64)
    }

    async fn assignments(&self, session: SessionId) -> GameResult<Vec<DeckCard>> {
        let tables = self.tables()?;
        let mut rows: Vec<DeckCard> = tables
            .placements
            .get(&session)
            .map(|placed| {
                placed
                    .iter()
                    .map(|(card, deck)| DeckCard {
                        card: *card,
                        deck: *deck,
                    })
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by_key(|row| row.card);
        Ok(rows)
    }

    async fn drop_session(&self, session: SessionId) -> GameResult<u64> {
        let mut tables = self.tables()?;
        let released = tables
            .placements
            .remove(&session)
            .map_or(0, |placed| placed.len() as u64);
        tables.decks.retain(|_, deck| deck.session != session);
        Ok(released)
    }
}
