//! Turn coordinator: the per-session state machine.
//!
//! A `Session` handle is cheap to clone. All state lives behind one
//! `tokio::sync::Mutex`, and every transition (human request or automated
//! loop iteration) runs to completion while holding it. Events are published
//! before the lock is released, so observers see them in commit order.
//!
//! The automated participant runs as a spawned task. It is cancelled
//! cooperatively: each time turn ownership or the loop generation changes, a
//! `watch` signal is sent, and the loop re-checks both after every pause and
//! before every flip.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::config::SessionConfig;
use super::events::{EventBroadcaster, FlipNotification, SessionEvent};
use super::slap::{SlapResolver, SlapVerdict};
use super::winner::{GameOutcome, WinDetector};
use crate::deck::{DeckCounts, DeckRepository, DeckStore};
use crate::game::{
    Card, CardFace, DeckRole, ExposedPair, GameError, GameResult, Participant,
    ParticipantId, ParticipantRole, Seat, SessionId,
};

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// Created, not dealt yet
    Idle,
    HumanTurn,
    /// The automated loop owns the turn
    AutomatedTurn,
    /// A matching pair is exposed and the automated loop is holding off
    SlapWindow,
    GameOver { winner: ParticipantId },
    /// Fatal inconsistency or repeated failure; a fresh deal is required
    Abandoned,
    Closed,
}

impl Phase {
    /// Whether a game is being played
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Phase::HumanTurn | Phase::AutomatedTurn | Phase::SlapWindow
        )
    }
}

/// Result of a flip request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlipOutcome {
    /// A card was flipped onto the discard deck
    Flipped { card: CardFace, sequence: u64 },
    /// A matching pair is exposed; nothing advanced
    Held,
    /// The flipper had no card left
    Eliminated { winner: ParticipantId },
}

/// Serializable snapshot of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session: SessionId,
    #[serde(flatten)]
    pub phase: Phase,
    pub turn_owner: ParticipantId,
    pub human: Participant,
    pub automated: Participant,
    pub previous: CardFace,
    pub newest: CardFace,
    pub claimed: bool,
    pub counts: DeckCounts,
    pub flips: u64,
}

/// Cancellation signal observed by the automated loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TurnSignal {
    owner: Seat,
    generation: u64,
}

/// What the automated loop waits for between actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pause {
    Interval,
    /// Grace window for the pair completed by this flip
    Grace(u64),
}

enum FlipStep {
    Flipped(Card, u64),
    Finished(Seat),
}

struct SessionState {
    phase: Phase,
    turn_owner: Seat,
    exposed: ExposedPair,
    decks: DeckStore,
    /// Bumped whenever the running automated loop must stop
    generation: u64,
    /// Flips committed so far
    sequence: u64,
    /// Consecutive failed automated iterations
    failures: u32,
    loop_task: Option<JoinHandle<()>>,
}

struct SessionInner {
    id: SessionId,
    human: Participant,
    automated: Participant,
    config: SessionConfig,
    state: Mutex<SessionState>,
    signal: watch::Sender<TurnSignal>,
    events: Arc<dyn EventBroadcaster>,
}

/// Handle to one game session
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Open a session and its decks. The session starts `Idle`.
    ///
    /// # Arguments
    ///
    /// * `id` - Session ID
    /// * `human` - Human participant
    /// * `automated` - Automated participant
    /// * `config` - Session configuration
    /// * `repo` - Deck storage collaborator
    /// * `events` - Event broadcaster
    ///
    /// # Returns
    ///
    /// * `GameResult<Session>` - Handle, or `InvalidState` on a bad configuration
    pub async fn open(
        id: SessionId,
        human: Participant,
        automated: Participant,
        config: SessionConfig,
        repo: Arc<dyn DeckRepository>,
        events: Arc<dyn EventBroadcaster>,
    ) -> GameResult<Self> {
        config.validate().map_err(GameError::InvalidState)?;
        if human.role != ParticipantRole::Human || automated.role != ParticipantRole::Automated {
            return Err(GameError::InvalidState(
                "a session seats one human and one automated participant".to_string(),
            ));
        }

        let decks = DeckStore::open(id, repo, human.id, automated.id, config.seed).await?;
        let (signal, _) = watch::channel(TurnSignal {
            owner: Seat::Human,
            generation: 0,
        });

        log::info!(
            "Session {} opened for {} against {}",
            id,
            human.name,
            automated.name
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                id,
                human,
                automated,
                config,
                state: Mutex::new(SessionState {
                    phase: Phase::Idle,
                    turn_owner: Seat::Human,
                    exposed: ExposedPair::default(),
                    decks,
                    generation: 0,
                    sequence: 0,
                    failures: 0,
                    loop_task: None,
                }),
                signal,
                events,
            }),
        })
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn participant(&self, seat: Seat) -> &Participant {
        match seat {
            Seat::Human => &self.inner.human,
            Seat::Automated => &self.inner.automated,
        }
    }

    /// Seat of a participant at this session
    pub fn seat_of(&self, participant: ParticipantId) -> GameResult<Seat> {
        if participant == self.inner.human.id {
            Ok(Seat::Human)
        } else if participant == self.inner.automated.id {
            Ok(Seat::Automated)
        } else {
            Err(GameError::UnknownParticipant(participant))
        }
    }

    pub async fn phase(&self) -> Phase {
        self.inner.state.lock().await.phase
    }

    /// Start a new game: redeal every card and give the turn to the human.
    ///
    /// Fails with `InvalidState` while a game is in progress or after close.
    pub async fn deal(&self) -> GameResult<()> {
        let mut state = self.inner.state.lock().await;
        self.ensure_restartable(&state)?;

        self.stop_loop(&mut state);
        if let Err(e) = state.decks.deal_session().await {
            self.abandon(&mut state, format!("deal failed: {e}"));
            return Err(e);
        }

        state.exposed.reset();
        state.failures = 0;
        self.publish(SessionEvent::Dealt {
            session: self.inner.id,
        });
        self.hand_turn_to(&mut state, Seat::Human);

        log::info!("Session {}: dealt, {} to flip", self.inner.id, self.inner.human.name);
        Ok(())
    }

    /// Resume play from the deck assignments already held by storage.
    ///
    /// The layout is audited first; the exposed pair starts empty and the
    /// human holds the turn.
    pub async fn resume(&self) -> GameResult<()> {
        let mut state = self.inner.state.lock().await;
        self.ensure_restartable(&state)?;

        self.stop_loop(&mut state);
        if let Err(e) = state.decks.audit().await {
            if e.is_fatal() {
                self.abandon(&mut state, e.to_string());
            }
            return Err(e);
        }

        state.exposed.reset();
        state.failures = 0;
        self.hand_turn_to(&mut state, Seat::Human);

        log::info!("Session {}: resumed from stored decks", self.inner.id);
        Ok(())
    }

    fn ensure_restartable(&self, state: &SessionState) -> GameResult<()> {
        if state.phase == Phase::Closed {
            return Err(GameError::InvalidState(format!(
                "session {} is closed",
                self.inner.id
            )));
        }
        if state.phase.is_active() {
            return Err(GameError::InvalidState(format!(
                "session {} already has a game in progress",
                self.inner.id
            )));
        }
        Ok(())
    }

    /// Flip on behalf of the human participant.
    ///
    /// While an unclaimed matching pair is exposed the request is held
    /// (`FlipOutcome::Held`) so it cannot bury a slap opportunity. Otherwise
    /// the human must own the turn; after a successful flip ownership passes
    /// to the automated participant and its loop starts.
    pub async fn request_flip(&self, participant: ParticipantId) -> GameResult<FlipOutcome> {
        let seat = self.seat_of(participant)?;
        let mut state = self.inner.state.lock().await;
        self.ensure_active(&state)?;

        if seat == Seat::Automated {
            return Err(GameError::InvalidState(
                "the automated participant flips on its own".to_string(),
            ));
        }

        if state.exposed.is_match() && !state.exposed.claimed {
            log::debug!("Session {}: flip held, matching pair exposed", self.inner.id);
            return Ok(FlipOutcome::Held);
        }

        if state.turn_owner != seat {
            return Err(GameError::InvalidState(format!(
                "not {}'s turn",
                self.participant(seat).name
            )));
        }

        match self.flip_step(&mut state, seat).await {
            Ok(FlipStep::Flipped(card, sequence)) => {
                self.hand_turn_to(&mut state, Seat::Automated);
                self.spawn_loop(&mut state);
                Ok(FlipOutcome::Flipped {
                    card: CardFace::from(&card),
                    sequence,
                })
            }
            Ok(FlipStep::Finished(winner)) => Ok(FlipOutcome::Eliminated {
                winner: self.participant(winner).id,
            }),
            Err(e) => {
                self.fail(&mut state, "flip", &e);
                Err(e)
            }
        }
    }

    /// Claim the exposed pair.
    ///
    /// An invalid, late or duplicate claim is rejected without effect. A
    /// resolved claim awards the discard deck and the turn to the slapper;
    /// when the human takes the turn this way the automated loop stops.
    pub async fn request_slap(&self, participant: ParticipantId) -> GameResult<SlapVerdict> {
        let seat = self.seat_of(participant)?;
        let mut state = self.inner.state.lock().await;
        self.ensure_active(&state)?;

        let owner_before = state.turn_owner;
        let verdict = match self.slap_step(&mut state, seat).await {
            Ok(verdict) => verdict,
            Err(e) => {
                self.fail(&mut state, "slap", &e);
                return Err(e);
            }
        };

        if verdict.is_resolved()
            && state.phase.is_active()
            && seat == Seat::Automated
            && owner_before != Seat::Automated
        {
            self.spawn_loop(&mut state);
        }
        Ok(verdict)
    }

    fn ensure_active(&self, state: &SessionState) -> GameResult<()> {
        if state.phase.is_active() {
            Ok(())
        } else {
            Err(GameError::InvalidState(format!(
                "session {} has no game in progress",
                self.inner.id
            )))
        }
    }

    /// Stop the automated loop and refuse further requests
    pub async fn close(&self) {
        let mut state = self.inner.state.lock().await;
        if state.phase == Phase::Closed {
            return;
        }

        self.stop_loop(&mut state);
        state.phase = Phase::Closed;
        log::info!("Session {} closed", self.inner.id);
    }

    /// Current state of the session for display
    pub async fn snapshot(&self) -> GameResult<SessionView> {
        let state = self.inner.state.lock().await;
        Ok(SessionView {
            session: self.inner.id,
            phase: state.phase,
            turn_owner: self.participant(state.turn_owner).id,
            human: self.inner.human.clone(),
            automated: self.inner.automated.clone(),
            previous: CardFace::from(&state.exposed.previous),
            newest: CardFace::from(&state.exposed.newest),
            claimed: state.exposed.claimed,
            counts: state.decks.counts().await?,
            flips: state.sequence,
        })
    }

    /// Whether an automated loop task is alive
    pub async fn automated_loop_running(&self) -> bool {
        let state = self.inner.state.lock().await;
        state
            .loop_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn publish(&self, event: SessionEvent) {
        self.inner.events.publish(event);
    }

    fn signal(&self, state: &SessionState) {
        self.inner.signal.send_replace(TurnSignal {
            owner: state.turn_owner,
            generation: state.generation,
        });
    }

    fn hand_turn_to(&self, state: &mut SessionState, seat: Seat) {
        let changed = state.turn_owner != seat || !state.phase.is_active();
        state.turn_owner = seat;
        state.phase = match seat {
            Seat::Human => Phase::HumanTurn,
            Seat::Automated => Phase::AutomatedTurn,
        };
        self.signal(state);

        if changed {
            self.publish(SessionEvent::TurnChanged {
                session: self.inner.id,
                owner: self.participant(seat).id,
            });
        }
    }

    fn stop_loop(&self, state: &mut SessionState) {
        state.generation += 1;
        state.loop_task = None;
        self.signal(state);
    }

    fn spawn_loop(&self, state: &mut SessionState) {
        state.generation += 1;
        self.signal(state);

        let session = self.clone();
        let generation = state.generation;
        state.loop_task = Some(tokio::spawn(async move {
            session.run_automated(generation).await;
        }));
        log::debug!(
            "Session {}: automated loop {} started",
            self.inner.id,
            generation
        );
    }

    fn finish(&self, state: &mut SessionState, winner: Seat) {
        let winner = self.participant(winner).id;
        state.phase = Phase::GameOver { winner };
        state.generation += 1;
        self.signal(state);
        self.publish(SessionEvent::GameOver {
            session: self.inner.id,
            winner,
        });
        log::info!("Session {}: game over, participant {} wins", self.inner.id, winner);
    }

    /// Abandon the session on a fatal error; anything else leaves it as is.
    fn fail(&self, state: &mut SessionState, action: &str, error: &GameError) {
        if error.is_fatal() {
            self.abandon(state, error.to_string());
        } else {
            log::warn!("Session {}: {} rejected: {}", self.inner.id, action, error);
        }
    }

    fn abandon(&self, state: &mut SessionState, reason: String) {
        log::error!("Session {} abandoned: {}", self.inner.id, reason);
        state.phase = Phase::Abandoned;
        state.generation += 1;
        self.signal(state);
        self.publish(SessionEvent::Abandoned {
            session: self.inner.id,
            reason,
        });
    }

    /// Flip one card for `seat`, refilling its play deck from collect once if
    /// needed, then check for a winner.
    async fn flip_step(&self, state: &mut SessionState, seat: Seat) -> GameResult<FlipStep> {
        let mut next = state.decks.top_of_play(seat).await?;
        if next.is_none() {
            let moved = state.decks.reset_from_collect(seat).await?;
            if moved > 0 {
                log::debug!(
                    "Session {}: {} play deck refilled with {} cards",
                    self.inner.id,
                    seat,
                    moved
                );
            }
            next = state.decks.top_of_play(seat).await?;
        }

        let Some(card) = next else {
            self.finish(state, seat.opponent());
            return Ok(FlipStep::Finished(seat.opponent()));
        };

        let play = state.decks.deck_id(seat, DeckRole::Play);
        let discard = state.decks.discard_id();
        state.decks.move_card(card.id, play, discard).await?;
        state.exposed.push(card.clone());
        state.sequence += 1;

        self.publish(SessionEvent::Flipped(FlipNotification {
            session: self.inner.id,
            sequence: state.sequence,
            flipper: self.participant(seat).id,
            newest: CardFace::from(&state.exposed.newest),
            previous: CardFace::from(&state.exposed.previous),
            at: Utc::now(),
        }));
        log::debug!(
            "Session {}: {} flipped {} (#{})",
            self.inner.id,
            seat,
            card,
            state.sequence
        );

        match self.winner_after_commit(state).await? {
            None => Ok(FlipStep::Flipped(card, state.sequence)),
            Some(winner) => {
                self.finish(state, winner);
                Ok(FlipStep::Finished(winner))
            }
        }
    }

    /// Look for a winner once a move has been committed.
    ///
    /// The move already happened, so a storage error here must not fail it.
    /// The check is skipped instead; a participant left without cards is
    /// caught on its next flip.
    async fn winner_after_commit(&self, state: &SessionState) -> GameResult<Option<Seat>> {
        match WinDetector::evaluate(&state.decks).await {
            Ok(GameOutcome::Ongoing) => Ok(None),
            Ok(GameOutcome::Winner(winner)) => Ok(Some(winner)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                log::warn!("Session {}: winner check skipped: {}", self.inner.id, e);
                Ok(None)
            }
        }
    }

    /// Resolve a slap for `seat` and apply the ownership change. Never
    /// starts a loop; callers decide that.
    async fn slap_step(&self, state: &mut SessionState, seat: Seat) -> GameResult<SlapVerdict> {
        let verdict =
            SlapResolver::attempt_slap(&mut state.exposed, &mut state.decks, seat).await?;

        let SlapVerdict::Resolved { cards_won } = verdict else {
            log::debug!(
                "Session {}: slap by {} rejected: {:?}",
                self.inner.id,
                seat,
                verdict
            );
            return Ok(verdict);
        };

        self.publish(SessionEvent::Slapped {
            session: self.inner.id,
            slapper: self.participant(seat).id,
            cards_won,
        });
        log::debug!(
            "Session {}: {} slapped and won {} cards",
            self.inner.id,
            seat,
            cards_won
        );
        self.hand_turn_to(state, seat);

        if let Some(winner) = self.winner_after_commit(state).await? {
            self.finish(state, winner);
        }
        Ok(verdict)
    }

    /// Whether the loop of `generation` may still act
    fn loop_may_act(state: &SessionState, generation: u64) -> bool {
        state.generation == generation
            && state.turn_owner == Seat::Automated
            && matches!(state.phase, Phase::AutomatedTurn | Phase::SlapWindow)
    }

    async fn run_automated(self, generation: u64) {
        let mut signal = self.inner.signal.subscribe();
        let mut graced: Option<u64> = None;

        loop {
            let pause = {
                let mut state = self.inner.state.lock().await;
                if !Self::loop_may_act(&state, generation) {
                    break;
                }

                if state.exposed.is_match()
                    && !state.exposed.claimed
                    && graced != Some(state.sequence)
                {
                    state.phase = Phase::SlapWindow;
                    Pause::Grace(state.sequence)
                } else {
                    Pause::Interval
                }
            };

            let wait = match pause {
                Pause::Interval => self.inner.config.flip_interval(),
                Pause::Grace(_) => self.inner.config.slap_grace(),
            };
            if !Self::pause(&mut signal, wait, generation).await {
                break;
            }

            let mut state = self.inner.state.lock().await;
            if !Self::loop_may_act(&state, generation) {
                break;
            }

            let mut claim = false;
            if let Pause::Grace(sequence) = pause {
                graced = Some(sequence);
                state.phase = Phase::AutomatedTurn;
                claim = self.inner.config.automated_slaps
                    && SlapResolver::judge(&state.exposed).is_none();
            }

            // A claimed pile is followed by a regular pause before the next flip
            let result = if claim {
                self.slap_step(&mut state, Seat::Automated).await.map(|_| ())
            } else {
                self.flip_step(&mut state, Seat::Automated).await.map(|_| ())
            };

            match result {
                Ok(()) => state.failures = 0,
                Err(e) if e.is_fatal() => {
                    self.abandon(&mut state, e.to_string());
                    break;
                }
                Err(e) => {
                    state.failures += 1;
                    log::warn!(
                        "Session {}: automated move failed ({}/{}): {}",
                        self.inner.id,
                        state.failures,
                        self.inner.config.max_consecutive_failures,
                        e
                    );
                    if state.failures >= self.inner.config.max_consecutive_failures {
                        self.abandon(&mut state, format!("automated moves keep failing: {e}"));
                        break;
                    }
                }
            }
        }

        log::debug!(
            "Session {}: automated loop {} stopped",
            self.inner.id,
            generation
        );
    }

    /// Sleep for `duration` unless the turn leaves the automated participant
    /// or the loop generation moves on. Returns false when the loop must stop.
    async fn pause(
        signal: &mut watch::Receiver<TurnSignal>,
        duration: Duration,
        generation: u64,
    ) -> bool {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                changed = signal.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }

            let current = *signal.borrow_and_update();
            if current.owner != Seat::Automated || current.generation != generation {
                return false;
            }
        }
    }
}
