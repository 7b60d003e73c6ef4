use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
    // Wild marks the two placeholder cards shown before anything is flipped.
    Wild,
}

impl Suit {
    pub const STANDARD: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];

    fn code(self) -> char {
        match self {
            Self::Club => 'C',
            Self::Spade => 'S',
            Self::Diamond => 'D',
            Self::Heart => 'H',
            Self::Wild => 'W',
        }
    }

    /// Parse the single-letter storage code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "C" => Some(Self::Club),
            "S" => Some(Self::Spade),
            "D" => Some(Self::Diamond),
            "H" => Some(Self::Heart),
            "W" => Some(Self::Wild),
            _ => None,
        }
    }

    pub fn as_code(self) -> String {
        self.code().to_string()
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Wild => "w",
        };
        write!(f, "{repr}")
    }
}

/// Card rank: ace=1 ... king=13. Placeholders use 0.
pub type Rank = u8;

/// Number of real cards in play for a session.
pub const STANDARD_DECK_SIZE: usize = 52;

/// Placeholder shown as the newest exposed card before any flip.
pub const NEWEST_SENTINEL: CardId = CardId(53);

/// Placeholder shown as the previous exposed card before two flips.
pub const PREVIOUS_SENTINEL: CardId = CardId(54);

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct CardId(pub u8);

impl CardId {
    /// ID of a standard card in the catalog.
    pub fn standard(rank: Rank, suit: Suit) -> Option<Self> {
        let offset = Suit::STANDARD.iter().position(|s| *s == suit)? as u8;
        (1..=13)
            .contains(&rank)
            .then(|| CardId(4 * (rank - 1) + offset + 1))
    }

    pub fn is_sentinel(self) -> bool {
        self == NEWEST_SENTINEL || self == PREVIOUS_SENTINEL
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An immutable card record.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card {
    pub id: CardId,
    pub rank: Rank,
    pub suit: Suit,
    /// Display reference handed to clients (image path).
    pub image: String,
}

impl Card {
    pub fn new(id: CardId, rank: Rank, suit: Suit) -> Self {
        let image = if id.is_sentinel() {
            "/images/cards/back.png".to_string()
        } else {
            format!("/images/cards/{}{}.png", rank_code(rank), suit.code())
        };
        Self {
            id,
            rank,
            suit,
            image,
        }
    }

    pub fn sentinel(id: CardId) -> Self {
        Self::new(id, 0, Suit::Wild)
    }

    pub fn is_sentinel(&self) -> bool {
        self.id.is_sentinel()
    }

    /// Rank equality between two real cards. Placeholders never match.
    pub fn matches(&self, other: &Card) -> bool {
        !self.is_sentinel() && !other.is_sentinel() && self.rank == other.rank
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_sentinel() {
            return write!(f, "  --");
        }
        let repr = format!("{}/{}", rank_code(self.rank), self.suit);
        write!(f, "{repr:>4}")
    }
}

fn rank_code(rank: Rank) -> String {
    match rank {
        1 => "A".to_string(),
        10 => "T".to_string(),
        11 => "J".to_string(),
        12 => "Q".to_string(),
        13 => "K".to_string(),
        v => v.to_string(),
    }
}

/// The full card catalog: 52 standard cards (ids 1..=52) followed by the
/// two placeholder records.
pub fn standard_cards() -> Vec<Card> {
    let mut cards = Vec::with_capacity(STANDARD_DECK_SIZE + 2);
    for rank in 1u8..=13 {
        for (j, suit) in Suit::STANDARD.into_iter().enumerate() {
            let id = CardId(4 * (rank - 1) + j as u8 + 1);
            cards.push(Card::new(id, rank, suit));
        }
    }
    cards.push(Card::sentinel(NEWEST_SENTINEL));
    cards.push(Card::sentinel(PREVIOUS_SENTINEL));
    cards
}

/// Opaque participant identifier resolved upstream.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ParticipantId(pub i64);

/// Reserved owner of the shared discard deck.
pub const DISCARD_OWNER: ParticipantId = ParticipantId(1);

/// Default identifier of the automated opponent.
pub const DEFAULT_AUTOMATED_ID: ParticipantId = ParticipantId(2);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Human,
    Automated,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: ParticipantRole,
}

impl Participant {
    pub fn human(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: ParticipantRole::Human,
        }
    }

    pub fn automated(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: ParticipantRole::Automated,
        }
    }
}

/// One of the two positions at a session.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    Human,
    Automated,
}

impl Seat {
    pub fn opponent(self) -> Self {
        match self {
            Self::Human => Self::Automated,
            Self::Automated => Self::Human,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Automated => write!(f, "automated"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct DeckId(pub i64);

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deck {}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckRole {
    Play,
    Collect,
    Discard,
}

impl DeckRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Collect => "collect",
            Self::Discard => "discard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "play" => Some(Self::Play),
            "collect" => Some(Self::Collect),
            "discard" => Some(Self::Discard),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Deck {
    pub id: DeckId,
    pub session: SessionId,
    pub owner: ParticipantId,
    pub role: DeckRole,
}

/// Association between a card and the deck currently holding it.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct DeckCard {
    pub card: CardId,
    pub deck: DeckId,
}

/// The two most recently flipped cards: previous then newest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExposedPair {
    pub previous: Card,
    pub newest: Card,
    /// Set once a slap has been resolved against this pair
    pub claimed: bool,
}

impl Default for ExposedPair {
    fn default() -> Self {
        Self {
            previous: Card::sentinel(PREVIOUS_SENTINEL),
            newest: Card::sentinel(NEWEST_SENTINEL),
            claimed: false,
        }
    }
}

impl ExposedPair {
    /// Expose a freshly flipped card, demoting the current newest.
    pub fn push(&mut self, card: Card) {
        self.previous = std::mem::replace(&mut self.newest, card);
        self.claimed = false;
    }

    /// Clear the table after a resolved slap; later claims see it as taken.
    pub fn mark_claimed(&mut self) {
        self.reset();
        self.claimed = true;
    }

    pub fn is_match(&self) -> bool {
        self.previous.matches(&self.newest)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Client-facing view of one side of the exposed pair.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CardFace {
    pub rank: Option<Rank>,
    pub suit: Option<Suit>,
    pub image: Option<String>,
}

impl From<&Card> for CardFace {
    fn from(card: &Card) -> Self {
        if card.is_sentinel() {
            return Self::default();
        }
        Self {
            rank: Some(card.rank),
            suit: Some(card.suit),
            image: Some(card.image.clone()),
        }
    }
}

impl fmt::Display for CardFace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.rank, self.suit) {
            (Some(rank), Some(suit)) => write!(f, "{}/{}", rank_code(rank), suit),
            _ => write!(f, "--"),
        }
    }
}
