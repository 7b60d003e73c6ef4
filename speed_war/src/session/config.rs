//! Session configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pacing presets for the automated participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameSpeed {
    Relaxed,
    Normal,
    Fast,
}

impl std::fmt::Display for GameSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSpeed::Relaxed => write!(f, "relaxed"),
            GameSpeed::Normal => write!(f, "normal"),
            GameSpeed::Fast => write!(f, "fast"),
        }
    }
}

impl std::str::FromStr for GameSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relaxed" => Ok(GameSpeed::Relaxed),
            "normal" => Ok(GameSpeed::Normal),
            "fast" => Ok(GameSpeed::Fast),
            other => Err(format!("unknown speed '{other}'")),
        }
    }
}

impl GameSpeed {
    /// (flip interval, slap grace) in milliseconds
    fn timings_ms(self) -> (u64, u64) {
        match self {
            GameSpeed::Relaxed => (2000, 1500),
            GameSpeed::Normal => (1000, 1000),
            GameSpeed::Fast => (500, 600),
        }
    }
}

/// Longest slap grace window accepted
pub const MAX_SLAP_GRACE_MS: u64 = 10_000;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Pacing preset the timings were derived from
    pub speed: GameSpeed,

    /// Delay between two automated flips
    pub flip_interval_ms: u64,

    /// How long a matching pair stays open for a slap before the automated
    /// participant moves on
    pub slap_grace_ms: u64,

    /// Whether the automated participant claims an unclaimed matching pair
    /// when the grace window expires
    pub automated_slaps: bool,

    /// RNG seed for reproducible deals (random when absent)
    pub seed: Option<u64>,

    /// Consecutive automated-loop failures tolerated before the session is
    /// abandoned
    pub max_consecutive_failures: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_speed(GameSpeed::Normal)
    }
}

impl SessionConfig {
    pub fn for_speed(speed: GameSpeed) -> Self {
        let (flip_interval_ms, slap_grace_ms) = speed.timings_ms();
        Self {
            speed,
            flip_interval_ms,
            slap_grace_ms,
            automated_slaps: false,
            seed: None,
            max_consecutive_failures: 3,
        }
    }

    /// Load configuration from environment variables
    ///
    /// - `SW_SPEED`: relaxed | normal | fast (default: normal)
    /// - `SW_FLIP_INTERVAL_MS`: overrides the preset flip interval
    /// - `SW_SLAP_GRACE_MS`: overrides the preset slap grace window
    /// - `SW_AUTOMATED_SLAPS`: true | false (default: false)
    /// - `SW_SEED`: RNG seed (default: random)
    /// - `SW_MAX_CONSECUTIVE_FAILURES`: default 3
    pub fn from_env() -> Self {
        let speed = std::env::var("SW_SPEED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(GameSpeed::Normal);
        let preset = Self::for_speed(speed);

        Self {
            speed,
            flip_interval_ms: env_or("SW_FLIP_INTERVAL_MS", preset.flip_interval_ms),
            slap_grace_ms: env_or("SW_SLAP_GRACE_MS", preset.slap_grace_ms),
            automated_slaps: env_or("SW_AUTOMATED_SLAPS", preset.automated_slaps),
            seed: std::env::var("SW_SEED").ok().and_then(|v| v.parse().ok()),
            max_consecutive_failures: env_or(
                "SW_MAX_CONSECUTIVE_FAILURES",
                preset.max_consecutive_failures,
            ),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.flip_interval_ms == 0 {
            return Err("Flip interval must be greater than 0".to_string());
        }

        if self.slap_grace_ms == 0 || self.slap_grace_ms > MAX_SLAP_GRACE_MS {
            return Err(format!(
                "Slap grace must be between 1 and {MAX_SLAP_GRACE_MS} ms"
            ));
        }

        if self.max_consecutive_failures == 0 {
            return Err("Max consecutive failures must be at least 1".to_string());
        }

        Ok(())
    }

    pub fn flip_interval(&self) -> Duration {
        Duration::from_millis(self.flip_interval_ms)
    }

    pub fn slap_grace(&self) -> Duration {
        Duration::from_millis(self.slap_grace_ms)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
