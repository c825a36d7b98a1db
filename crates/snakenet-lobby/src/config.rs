//! Lobby configuration and status machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use snakenet_sim::GameConfig;

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Settings for the lobby and the matches it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Players per match.
    pub player_slots: usize,

    /// Seconds counted down before a match starts.
    pub countdown_secs: u32,

    /// Seconds the result is shown before the lobby reopens.
    pub results_secs: u32,

    /// Simulation heartbeat in Hz.
    pub tick_rate_hz: u32,

    /// How far after `game_start` is sent the first step happens, giving
    /// clients time to receive it.
    pub start_delay_ms: u64,

    /// How long a time-sync request may go unanswered.
    pub time_sync_timeout_ms: u64,

    /// Longest accepted display name, in characters.
    pub max_name_len: usize,

    /// Unacknowledged inputs a client keeps before refusing more. Also
    /// bounds each player's input queue on the server.
    pub max_pending_inputs: usize,

    /// Grid and snake settings for every match.
    pub game: GameConfig,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            player_slots: 2,
            countdown_secs: 3,
            results_secs: 3,
            tick_rate_hz: 10,
            start_delay_ms: 500,
            time_sync_timeout_ms: 2_000,
            max_name_len: 24,
            max_pending_inputs: 64,
            game: GameConfig::default(),
        }
    }
}

impl LobbyConfig {
    /// The heartbeat period.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(1_000 / u64::from(self.tick_rate_hz.max(1)))
    }

    /// The game config with its step period matched to the heartbeat.
    pub fn match_game_config(&self) -> GameConfig {
        GameConfig {
            tick_interval_ms: self.tick_period().as_millis() as u64,
            ..self.game.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// LobbyStatus
// ---------------------------------------------------------------------------

/// Where the lobby is in its cycle.
///
/// ```text
/// WaitingPlayers → Countdown → Playing → ResultsCountdown → WaitingPlayers
///                      │
///                      └── (player left) → WaitingPlayers
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyStatus {
    WaitingPlayers,
    Countdown,
    Playing,
    ResultsCountdown,
}

impl LobbyStatus {
    /// The status that normally follows this one.
    pub fn next(self) -> Self {
        match self {
            Self::WaitingPlayers => Self::Countdown,
            Self::Countdown => Self::Playing,
            Self::Playing => Self::ResultsCountdown,
            Self::ResultsCountdown => Self::WaitingPlayers,
        }
    }

    /// `true` if moving to `target` is allowed. The only shortcut is a
    /// cancelled countdown going back to waiting.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == target || (self == Self::Countdown && target == Self::WaitingPlayers)
    }

    /// `true` while the 1 Hz countdown timer should run.
    pub fn is_counting_down(self) -> bool {
        matches!(self, Self::Countdown | Self::ResultsCountdown)
    }
}

impl std::fmt::Display for LobbyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingPlayers => write!(f, "WAITING_PLAYERS"),
            Self::Countdown => write!(f, "COUNTDOWN"),
            Self::Playing => write!(f, "PLAYING"),
            Self::ResultsCountdown => write!(f, "RESULTS_COUNTDOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_status_next_cycles() {
        let mut status = LobbyStatus::WaitingPlayers;
        let mut seen = vec![status];
        for _ in 0..4 {
            status = status.next();
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![
                LobbyStatus::WaitingPlayers,
                LobbyStatus::Countdown,
                LobbyStatus::Playing,
                LobbyStatus::ResultsCountdown,
                LobbyStatus::WaitingPlayers,
            ]
        );
    }

    #[test]
    fn test_lobby_status_can_transition_to() {
        assert!(LobbyStatus::Countdown.can_transition_to(LobbyStatus::WaitingPlayers));
        assert!(LobbyStatus::Countdown.can_transition_to(LobbyStatus::Playing));
        assert!(!LobbyStatus::Playing.can_transition_to(LobbyStatus::WaitingPlayers));
        assert!(!LobbyStatus::WaitingPlayers.can_transition_to(LobbyStatus::Playing));
    }

    #[test]
    fn test_lobby_status_display() {
        assert_eq!(LobbyStatus::WaitingPlayers.to_string(), "WAITING_PLAYERS");
        assert_eq!(LobbyStatus::ResultsCountdown.to_string(), "RESULTS_COUNTDOWN");
    }

    #[test]
    fn test_lobby_config_default() {
        let config = LobbyConfig::default();
        assert_eq!(config.player_slots, 2);
        assert_eq!(config.countdown_secs, 3);
        assert_eq!(config.tick_period(), Duration::from_millis(100));
        assert_eq!(config.game.initial_length, 4);
    }

    #[test]
    fn test_match_game_config_follows_heartbeat() {
        let config = LobbyConfig {
            tick_rate_hz: 20,
            ..LobbyConfig::default()
        };
        assert_eq!(config.match_game_config().tick_interval_ms, 50);
    }
}
