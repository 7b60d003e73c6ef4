//! Game sessions: turn coordination, slap resolution, win detection and
//! event publishing.
//!
//! This module implements:
//! - `Session`: the turn coordinator state machine and the automated loop
//! - `SlapResolver` and `WinDetector`
//! - `SessionEvent` and the `EventBroadcaster` publish contract
//! - `SessionManager` for running many sessions side by side
//! - `SessionConfig` pacing presets

pub mod config;
pub mod coordinator;
pub mod events;
pub mod manager;
pub mod slap;
pub mod winner;

pub use config::{GameSpeed, MAX_SLAP_GRACE_MS, SessionConfig};
pub use coordinator::{FlipOutcome, Phase, Session, SessionView};
pub use events::{ChannelBroadcaster, EventBroadcaster, FlipNotification, SessionEvent};
pub use manager::{SessionManager, SessionSummary};
pub use slap::{RejectReason, SlapResolver, SlapVerdict};
pub use winner::{GameOutcome, WinDetector};
