//! Shared helpers for session integration tests.

#![allow(dead_code)]

use speed_war::game::{DEFAULT_AUTOMATED_ID, DISCARD_OWNER, STANDARD_DECK_SIZE};
use speed_war::{
    CardId, ChannelBroadcaster, DeckRepository, DeckRole, MemoryDeckRepository, Participant,
    ParticipantId, Session, SessionConfig, SessionEvent, SessionId, Suit,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

pub const SESSION: SessionId = SessionId(1);
pub const HUMAN: ParticipantId = ParticipantId(100);
pub const BOT: ParticipantId = DEFAULT_AUTOMATED_ID;

#[derive(Debug, Clone, Copy)]
pub enum Pile {
    HumanPlay,
    HumanCollect,
    BotPlay,
    BotCollect,
    Discard,
}

pub fn card(rank: u8, suit: Suit) -> CardId {
    CardId::standard(rank, suit).expect("standard card")
}

/// Store a layout: the listed cards first, every other real card on `rest`.
pub async fn arrange(repo: &MemoryDeckRepository, piles: &[(Pile, Vec<CardId>)], rest: Pile) {
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
    let deck = repo
        .ensure_deck(SESSION, owner, role)
        .await
        .expect("Failed to create deck");
    repo.place_card(SESSION, card, deck.id)
        .await
        .expect("Failed to place card");
}

/// An open session plus a subscription to its events
pub struct Harness {
    pub session: Session,
    pub repo: Arc<MemoryDeckRepository>,
    pub events: broadcast::Receiver<SessionEvent>,
}

pub async fn open_session(repo: Arc<MemoryDeckRepository>, config: SessionConfig) -> Harness {
    let broadcaster = Arc::new(ChannelBroadcaster::default());
    let events = broadcaster.subscribe();
    let session = Session::open(
        SESSION,
        Participant::human(HUMAN, "alice"),
        Participant::automated(BOT, "Speedy"),
        config,
        repo.clone(),
        broadcaster,
    )
    .await
    .expect("Failed to open session");

    Harness {
        session,
        repo,
        events,
    }
}

/// Open a session over an arranged layout and resume play from it
pub async fn resume_arranged(
    piles: &[(Pile, Vec<CardId>)],
    rest: Pile,
    config: SessionConfig,
) -> Harness {
    let repo = Arc::new(MemoryDeckRepository::new());
    arrange(&repo, piles, rest).await;
    let harness = open_session(repo, config).await;
    harness
        .session
        .resume()
        .await
        .expect("Failed to resume session");
    harness
}

/// Human holds the 7 of hearts, the automated participant the 7 of clubs.
/// The other sevens sit in the human's collect deck so the automated
/// participant cannot draw another one.
pub async fn sevens_layout(config: SessionConfig) -> Harness {
    resume_arranged(
        &[
            (Pile::HumanPlay, vec![card(7, Suit::Heart)]),
            (
                Pile::HumanCollect,
                vec![card(2, Suit::Diamond), card(7, Suit::Spade), card(7, Suit::Diamond)],
            ),
            (Pile::BotPlay, vec![card(7, Suit::Club)]),
        ],
        Pile::BotCollect,
        config,
    )
    .await
}

/// Every event received so far
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}

/// Every card of the session is held by exactly one deck
pub async fn assert_conserved(repo: &MemoryDeckRepository) {
    let rows = repo.assignments(SESSION).await.expect("assignments");
    let unique: HashSet<CardId> = rows.iter().map(|row| row.card).collect();
    assert_eq!(rows.len(), STANDARD_DECK_SIZE);
    assert_eq!(unique.len(), STANDARD_DECK_SIZE);
}
