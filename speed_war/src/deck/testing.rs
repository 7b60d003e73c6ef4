//! Arranged deck layouts for unit tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use super::{DeckRepository, MemoryDeckRepository};
use crate::game::{
    Card, CardId, DISCARD_OWNER, Deck, DeckCard, DeckId, DeckRole, GameError, GameResult,
    ParticipantId, Rank, STANDARD_DECK_SIZE, SessionId, Suit,
};

pub(crate) const SESSION: SessionId = SessionId(1);
pub(crate) const HUMAN: ParticipantId = ParticipantId(100);
pub(crate) const BOT: ParticipantId = ParticipantId(2);

#[derive(Debug, Clone, Copy)]
pub(crate) enum Pile {
    HumanPlay,
    HumanCollect,
    BotPlay,
    BotCollect,
    Discard,
}

pub(crate) fn card(rank: Rank, suit: Suit) -> CardId {
    CardId::standard(rank, suit).expect("standard card")
}

/// Place the listed cards, then every remaining real card on `rest`.
pub(crate) async fn arrange(repo: &MemoryDeckRepository, piles: &[(Pile, Vec<CardId>)], rest: Pile) {
    let mut placed = HashSet::new();
    for (pile, cards) in piles {
        for card in cards {
            place(repo, *pile, *card).await;
            placed.insert(*card);
        }
    }

    for id in 1..=STANDARD_DECK_SIZE as u8 {
        if !placed.contains(&CardId(id)) {
            place(repo, rest, CardId(id)).await;
        }
    }
}

async fn place(repo: &MemoryDeckRepository, pile: Pile, card: CardId) {
    let (owner, role) = match pile {
        Pile::HumanPlay => (HUMAN, DeckRole::Play),
        Pile::HumanCollect => (HUMAN, DeckRole::Collect),
        Pile::BotPlay => (BOT, DeckRole::Play),
        Pile::BotCollect => (BOT, DeckRole::Collect),
        Pile::Discard => (DISCARD_OWNER, DeckRole::Discard),
    };
    let deck = repo.ensure_deck(SESSION, owner, role).await.unwrap();
    repo.place_card(SESSION, card, deck.id).await.unwrap();
}

/// Storage error injected by [`FlakyDeckRepository`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    /// Transient backend trouble
    Storage,
    /// Data the engine can no longer trust
    Corrupt,
}

impl Fault {
    fn error(self) -> GameError {
        match self {
            Fault::Storage => GameError::Database(sqlx::Error::PoolTimedOut),
            Fault::Corrupt => GameError::InvariantViolation("injected corruption".to_string()),
        }
    }
}

/// Memory repository whose relocations and deck reads fail on demand.
pub(crate) struct FlakyDeckRepository {
    inner: MemoryDeckRepository,
    relocations: Mutex<Option<Fault>>,
    reads: Mutex<Option<(DeckId, Fault)>>,
}

impl FlakyDeckRepository {
    pub(crate) fn new(inner: MemoryDeckRepository) -> Self {
        Self {
            inner,
            relocations: Mutex::new(None),
            reads: Mutex::new(None),
        }
    }

    /// Make every relocation fail with `fault`, or succeed again with `None`
    pub(crate) fn fail_relocations(&self, fault: Option<Fault>) {
        *self.relocations.lock().unwrap() = fault;
    }

    /// Make listing one deck's cards fail, or succeed again with `None`
    pub(crate) fn fail_reads_of(&self, deck: Option<(DeckId, Fault)>) {
        *self.reads.lock().unwrap() = deck;
    }
}

#[async_trait]
impl DeckRepository for FlakyDeckRepository {
    async fn load_cards(&self) -> GameResult<Vec<Card>> {
        self.inner.load_cards().await
    }

    async fn ensure_deck(
        &self,
        session: SessionId,
        owner: ParticipantId,
        role: DeckRole,
    ) -> GameResult<Deck> {
        self.inner.ensure_deck(session, owner, role).await
    }

    async fn deck_cards(&self, deck: DeckId) -> GameResult<Vec<CardId>> {
        let fault = *self.reads.lock().unwrap();
        match fault {
            Some((failing, fault)) if failing == deck => Err(fault.error()),
            _ => self.inner.deck_cards(deck).await,
        }
    }

    async fn place_card(&self, session: SessionId, card: CardId, deck: DeckId) -> GameResult<()> {
        self.inner.place_card(session, card, deck).await
    }

    async fn relocate(
        &self,
        session: SessionId,
        card: CardId,
        from: DeckId,
        to: DeckId,
    ) -> GameResult<bool> {
        let fault = *self.relocations.lock().unwrap();
        match fault {
            Some(fault) => Err(fault.error()),
            None => self.inner.relocate(session, card, from, to).await,
        }
    }

    async fn clear_deck(&self, deck: DeckId) -> GameResult<u64> {
        self.inner.clear_deck(deck).await
    }

    async fn assignments(&self, session: SessionId) -> GameResult<Vec<DeckCard>> {
        self.inner.assignments(session).await
    }

    async fn drop_session(&self, session: SessionId) -> GameResult<u64> {
        self.inner.drop_session(session).await
    }
}
