//! Server configuration, loadable from YAML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snakenet_lobby::LobbyConfig;
use snakenet_sim::SnakeGame;

/// Highest heartbeat the server accepts.
pub const MAX_TICK_RATE_HZ: u32 = 128;

/// Errors from loading or validating a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything needed to run a server.
///
/// Missing fields take their defaults, so an empty file is a valid
/// config:
///
/// ```yaml
/// bind: 0.0.0.0:8080
/// lobby:
///   countdown_secs: 5
///   game:
///     grid_width: 30
///     grid_height: 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind: String,

    /// Seconds a connection may stay silent before it is dropped. 0
    /// disables the timeout.
    pub idle_timeout_secs: u64,

    /// Capacity of the lobby actor's command queue.
    pub lobby_channel_size: usize,

    pub lobby: LobbyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            idle_timeout_secs: 300,
            lobby_channel_size: 256,
            lobby: LobbyConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads, parses and validates a YAML config file.
    ///
    /// # Errors
    /// [`ConfigError`] if the file can't be read, isn't valid YAML for
    /// this struct, or fails [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a default map.
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the lobby can actually run with these settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        let lobby = &self.lobby;

        if self.bind.trim().is_empty() {
            return invalid("bind address is empty".into());
        }
        if self.lobby_channel_size == 0 {
            return invalid("lobby_channel_size must be at least 1".into());
        }
        if lobby.player_slots == 0 {
            return invalid("player_slots must be at least 1".into());
        }
        if lobby.tick_rate_hz == 0 || lobby.tick_rate_hz > MAX_TICK_RATE_HZ {
            return invalid(format!(
                "tick_rate_hz must be between 1 and {MAX_TICK_RATE_HZ}, got {}",
                lobby.tick_rate_hz
            ));
        }
        if lobby.time_sync_timeout_ms == 0 {
            return invalid("time_sync_timeout_ms must be positive".into());
        }
        if lobby.max_name_len == 0 {
            return invalid("max_name_len must be at least 1".into());
        }
        if lobby.max_pending_inputs == 0 {
            return invalid("max_pending_inputs must be at least 1".into());
        }
        SnakeGame::create_seeded(&lobby.match_game_config(), 0)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// `None` when the idle timeout is disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}
