//! Deck store: the card relocation service for one session.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::repository::DeckRepository;
use crate::game::{
    Card, CardId, DISCARD_OWNER, Deck, DeckId, DeckRole, GameError, GameResult, ParticipantId,
    STANDARD_DECK_SIZE, Seat, SessionId,
};

#[derive(Debug, Clone, Copy)]
struct SeatDecks {
    play: Deck,
    collect: Deck,
}

/// Number of cards in one participant's decks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeatCounts {
    pub play: usize,
    pub collect: usize,
}

impl SeatCounts {
    pub fn total(&self) -> usize {
        self.play + self.collect
    }
}

/// Card counts across every deck of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeckCounts {
    pub human: SeatCounts,
    pub automated: SeatCounts,
    pub discard: usize,
}

impl DeckCounts {
    pub fn total(&self) -> usize {
        self.human.total() + self.automated.total() + self.discard
    }

    pub fn seat(&self, seat: Seat) -> SeatCounts {
        match seat {
            Seat::Human => self.human,
            Seat::Automated => self.automated,
        }
    }
}

/// Owns the card-to-deck assignments of one session.
///
/// Draws are randomized: there is no positional access to a deck, only
/// "some remaining card". Every mutation goes through `move_card`, which
/// the repository applies as one atomic relocation.
pub struct DeckStore {
    session: SessionId,
    repo: Arc<dyn DeckRepository>,
    catalog: HashMap<CardId, Card>,
    human: SeatDecks,
    automated: SeatDecks,
    discard: Deck,
    rng: StdRng,
    /// Card last offered by `top_of_play`, per play deck
    peeked: HashMap<DeckId, CardId>,
    dealing: bool,
}

impl DeckStore {
    /// Open (creating if needed) the five decks of a session.
    ///
    /// # Arguments
    ///
    /// * `session` - Session the decks belong to
    /// * `repo` - Storage collaborator
    /// * `human` - Human participant ID
    /// * `automated` - Automated participant ID
    /// * `seed` - Optional RNG seed for reproducible deals and draws
    pub async fn open(
        session: SessionId,
        repo: Arc<dyn DeckRepository>,
        human: ParticipantId,
        automated: ParticipantId,
        seed: Option<u64>,
    ) -> GameResult<Self> {
        if human == automated || human == DISCARD_OWNER || automated == DISCARD_OWNER {
            return Err(GameError::InvalidState(format!(
                "participants {human} and {automated} must be distinct and not {DISCARD_OWNER}"
            )));
        }

        let catalog = repo
            .load_cards()
            .await?
            .into_iter()
            .map(|card| (card.id, card))
            .collect::<HashMap<_, _>>();
        let standard = catalog.values().filter(|c| !c.is_sentinel()).count();
        if standard != STANDARD_DECK_SIZE {
            return Err(GameError::InvariantViolation(format!(
                "card catalog holds {standard} cards, expected {STANDARD_DECK_SIZE}"
            )));
        }

        let human = SeatDecks {
            play: repo.ensure_deck(session, human, DeckRole::Play).await?,
            collect: repo.ensure_deck(session, human, DeckRole::Collect).await?,
        };
        let automated = SeatDecks {
            play: repo.ensure_deck(session, automated, DeckRole::Play).await?,
            collect: repo
                .ensure_deck(session, automated, DeckRole::Collect)
                .await?,
        };
        let discard = repo
            .ensure_deck(session, DISCARD_OWNER, DeckRole::Discard)
            .await?;

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            session,
            repo,
            catalog,
            human,
            automated,
            discard,
            rng,
            peeked: HashMap::new(),
            dealing: false,
        })
    }

    fn seat(&self, seat: Seat) -> &SeatDecks {
        match seat {
            Seat::Human => &self.human,
            Seat::Automated => &self.automated,
        }
    }

    /// Deck ID for a participant's play or collect deck
    pub fn deck_id(&self, seat: Seat, role: DeckRole) -> DeckId {
        match role {
            DeckRole::Play => self.seat(seat).play.id,
            DeckRole::Collect => self.seat(seat).collect.id,
            DeckRole::Discard => self.discard.id,
        }
    }

    pub fn discard_id(&self) -> DeckId {
        self.discard.id
    }

    /// Look up a card record by ID
    pub fn card(&self, id: CardId) -> GameResult<&Card> {
        self.catalog
            .get(&id)
            .ok_or_else(|| GameError::InvariantViolation(format!("unknown card {id}")))
    }

    fn all_decks(&self) -> [Deck; 5] {
        [
            self.human.play,
            self.human.collect,
            self.automated.play,
            self.automated.collect,
            self.discard,
        ]
    }

    /// Clear every deck and deal the 52 real cards alternately into the two
    /// play decks, the human receiving first.
    ///
    /// Fails with `InvalidState` if a deal is already in progress.
    pub async fn deal_session(&mut self) -> GameResult<()> {
        if self.dealing {
            return Err(GameError::InvalidState(
                "deal already in progress".to_string(),
            ));
        }

        self.dealing = true;
        let result = self.deal_inner().await;
        self.dealing = false;
        result
    }

    async fn deal_inner(&mut self) -> GameResult<()> {
        for deck in self.all_decks() {
            self.repo.clear_deck(deck.id).await?;
        }
        self.peeked.clear();

        let mut remaining: Vec<CardId> = self
            .catalog
            .values()
            .filter(|c| !c.is_sentinel())
            .map(|c| c.id)
            .collect();
        remaining.sort();

        let mut recipient = Seat::Human;
        while !remaining.is_empty() {
            let idx = self.rng.random_range(0..remaining.len());
            let card = remaining.swap_remove(idx);
            let deck = self.seat(recipient).play.id;
            self.repo.place_card(self.session, card, deck).await?;
            recipient = recipient.opponent();
        }

        log::debug!("Session {}: dealt {} cards", self.session, STANDARD_DECK_SIZE);
        Ok(())
    }

    /// Atomically relocate one card.
    ///
    /// Fails with `CardNotFound` (state unchanged) if the card is not in `from`.
    pub async fn move_card(&mut self, card: CardId, from: DeckId, to: DeckId) -> GameResult<()> {
        if !self.repo.relocate(self.session, card, from, to).await? {
            return Err(GameError::CardNotFound { card, deck: from });
        }

        self.peeked.retain(|_, peeked| *peeked != card);
        Ok(())
    }

    /// The card a participant would flip next, without removing it.
    ///
    /// The choice is random among the remaining cards but stays stable until
    /// the play deck changes.
    pub async fn top_of_play(&mut self, seat: Seat) -> GameResult<Option<Card>> {
        let deck = self.seat(seat).play.id;
        let cards = self.repo.deck_cards(deck).await?;
        if cards.is_empty() {
            self.peeked.remove(&deck);
            return Ok(None);
        }

        let chosen = match self.peeked.get(&deck) {
            Some(card) if cards.contains(card) => *card,
            _ => {
                let card = cards[self.rng.random_range(0..cards.len())];
                self.peeked.insert(deck, card);
                card
            }
        };

        self.card(chosen).cloned().map(Some)
    }

    /// True iff both the play and collect decks of a participant are empty
    pub async fn empty_of(&self, seat: Seat) -> GameResult<bool> {
        let decks = self.seat(seat);
        Ok(self.repo.deck_cards(decks.play.id).await?.is_empty()
            && self.repo.deck_cards(decks.collect.id).await?.is_empty())
    }

    /// Move a participant's whole collect deck into their play deck.
    ///
    /// Only applies when the play deck has run out; otherwise (or with an
    /// empty collect deck) it changes nothing. Returns the number of cards moved.
    pub async fn reset_from_collect(&mut self, seat: Seat) -> GameResult<usize> {
        let decks = *self.seat(seat);
        if !self.repo.deck_cards(decks.play.id).await?.is_empty() {
            return Ok(0);
        }

        self.move_all(decks.collect.id, decks.play.id).await
    }

    /// Move every card in the shared discard deck into a participant's
    /// collect deck. Returns the number of cards moved.
    pub async fn drain_discard_to(&mut self, seat: Seat) -> GameResult<usize> {
        let to = self.seat(seat).collect.id;
        self.move_all(self.discard.id, to).await
    }

    async fn move_all(&mut self, from: DeckId, to: DeckId) -> GameResult<usize> {
        let cards = self.repo.deck_cards(from).await?;
        for card in &cards {
            self.move_card(*card, from, to).await?;
        }
        Ok(cards.len())
    }

    /// Count the cards held by every deck
    pub async fn counts(&self) -> GameResult<DeckCounts> {
        let len = |cards: Vec<CardId>| cards.len();
        Ok(DeckCounts {
            human: SeatCounts {
                play: len(self.repo.deck_cards(self.human.play.id).await?),
                collect: len(self.repo.deck_cards(self.human.collect.id).await?),
            },
            automated: SeatCounts {
                play: len(self.repo.deck_cards(self.automated.play.id).await?),
                collect: len(self.repo.deck_cards(self.automated.collect.id).await?),
            },
            discard: len(self.repo.deck_cards(self.discard.id).await?),
        })
    }

    /// Verify that every real card is held by exactly one deck of this
    /// session and that nothing else is.
    pub async fn audit(&self) -> GameResult<()> {
        let ours: HashSet<DeckId> = self.all_decks().iter().map(|d| d.id).collect();
        let mut seen = HashSet::new();

        for row in self.repo.assignments(self.session).await? {
            if !ours.contains(&row.deck) {
                return Err(GameError::InvariantViolation(format!(
                    "card {} held by foreign {}",
                    row.card, row.deck
                )));
            }
            if self.card(row.card)?.is_sentinel() {
                return Err(GameError::InvariantViolation(format!(
                    "placeholder card {} placed in {}",
                    row.card, row.deck
                )));
            }
            if !seen.insert(row.card) {
                return Err(GameError::InvariantViolation(format!(
                    "card {} held by more than one deck",
                    row.card
                )));
            }
        }

        if seen.len() != STANDARD_DECK_SIZE {
            return Err(GameError::InvariantViolation(format!(
                "{} cards in play, expected {STANDARD_DECK_SIZE}",
                seen.len()
            )));
        }
        Ok(())
    }
}
