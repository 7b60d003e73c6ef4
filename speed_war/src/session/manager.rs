//! Session manager for creating and tracking game sessions.

use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{RwLock, broadcast};

use super::{
    config::SessionConfig,
    coordinator::{Phase, Session},
    events::{ChannelBroadcaster, SessionEvent},
};
use crate::deck::DeckRepository;
use crate::game::{
    DEFAULT_AUTOMATED_ID, GameError, GameResult, Participant, ParticipantId, SessionId,
};

/// Session metadata for listings
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub human: Participant,
    #[serde(flatten)]
    pub phase: Phase,
}

struct SessionEntry {
    session: Session,
    events: Arc<ChannelBroadcaster>,
}

/// Manages the live sessions of one process
pub struct SessionManager {
    /// Deck storage shared by every session
    repo: Arc<dyn DeckRepository>,

    /// Configuration applied to new sessions
    config: SessionConfig,

    /// Active sessions
    sessions: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,

    /// Next session ID
    next_session_id: Arc<RwLock<i64>>,
}

impl SessionManager {
    /// Create a new session manager
    ///
    /// # Arguments
    ///
    /// * `repo` - Deck storage shared by all sessions
    /// * `config` - Configuration for new sessions
    pub fn new(repo: Arc<dyn DeckRepository>, config: SessionConfig) -> Self {
        Self {
            repo,
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_session_id: Arc::new(RwLock::new(1)),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open a session pairing a human participant with the automated one.
    ///
    /// The session starts idle; call `deal` on it to begin.
    pub async fn create_session(
        &self,
        participant: ParticipantId,
        name: impl Into<String>,
    ) -> GameResult<SessionId> {
        let id = {
            let mut next_id = self.next_session_id.write().await;
            let id = SessionId(*next_id);
            *next_id += 1;
            id
        };

        let events = Arc::new(ChannelBroadcaster::default());
        let session = Session::open(
            id,
            Participant::human(participant, name),
            Participant::automated(DEFAULT_AUTOMATED_ID, "Speedy"),
            self.config.clone(),
            self.repo.clone(),
            events.clone(),
        )
        .await?;

        self.sessions
            .write()
            .await
            .insert(id, SessionEntry { session, events });

        log::info!("Created session {} for participant {}", id, participant);
        Ok(id)
    }

    pub async fn get_session(&self, id: SessionId) -> GameResult<Session> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|entry| entry.session.clone())
            .ok_or(GameError::SessionNotFound(id))
    }

    /// Receive the events a session publishes from now on
    pub async fn subscribe(&self, id: SessionId) -> GameResult<broadcast::Receiver<SessionEvent>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|entry| entry.events.subscribe())
            .ok_or(GameError::SessionNotFound(id))
    }

    /// List every live session, lowest ID first
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .map(|entry| entry.session.clone())
            .collect();

        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            summaries.push(SessionSummary {
                id: session.id(),
                human: session.participant(crate::game::Seat::Human).clone(),
                phase: session.phase().await,
            });
        }
        summaries.sort_by_key(|summary| summary.id);
        summaries
    }

    /// Close a session and forget it, releasing its decks in storage
    pub async fn close_session(&self, id: SessionId) -> GameResult<()> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(GameError::SessionNotFound(id))?;

        entry.session.close().await;
        let released = self.repo.drop_session(id).await?;
        log::info!("Closed session {} ({} cards released)", id, released);
        Ok(())
    }

    /// Close every session
    pub async fn shutdown(&self) {
        let entries: Vec<SessionEntry> = self.sessions.write().await.drain().map(|(_, e)| e).collect();
        for entry in &entries {
            let id = entry.session.id();
            entry.session.close().await;
            if let Err(e) = self.repo.drop_session(id).await {
                log::warn!("Failed to release decks of session {}: {}", id, e);
            }
        }
        log::info!("Closed {} sessions", entries.len());
    }
}
