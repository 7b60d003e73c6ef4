//! Session events and the broadcaster contract used to publish them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::game::{CardFace, ParticipantId, SessionId};

/// Result of one flip: both sides of the exposed pair after the flip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlipNotification {
    pub session: SessionId,

    /// Position of this flip in the session's commit order
    pub sequence: u64,

    /// Participant whose card was flipped
    pub flipper: ParticipantId,

    /// Card just flipped
    pub newest: CardFace,

    /// Card flipped before it
    pub previous: CardFace,

    pub at: DateTime<Utc>,
}

/// Events published by a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new deal was made
    Dealt { session: SessionId },

    /// A card was flipped onto the discard pile
    Flipped(FlipNotification),

    /// A slap was resolved and the discard pile awarded
    Slapped {
        session: SessionId,
        slapper: ParticipantId,
        cards_won: usize,
    },

    /// Turn ownership passed to another participant
    TurnChanged {
        session: SessionId,
        owner: ParticipantId,
    },

    /// A participant ran out of cards
    GameOver {
        session: SessionId,
        winner: ParticipantId,
    },

    /// The session hit an unrecoverable error and needs a fresh deal
    Abandoned { session: SessionId, reason: String },
}

impl SessionEvent {
    pub fn session(&self) -> SessionId {
        match self {
            SessionEvent::Dealt { session }
            | SessionEvent::Slapped { session, .. }
            | SessionEvent::TurnChanged { session, .. }
            | SessionEvent::GameOver { session, .. }
            | SessionEvent::Abandoned { session, .. } => *session,
            SessionEvent::Flipped(flip) => flip.session,
        }
    }
}

/// Receives session events and disseminates them to observers.
///
/// `publish` is called while the session's state lock is held, so events
/// arrive in the exact order their mutations committed. Implementations
/// must not block.
pub trait EventBroadcaster: Send + Sync {
    fn publish(&self, event: SessionEvent);
}

/// Broadcaster fanning events out over a tokio broadcast channel
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBroadcaster for ChannelBroadcaster {
    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine: nobody is watching this session.
        if self.sender.send(event).is_err() {
            log::trace!("Event dropped: no subscribers");
        }
    }
}
