//! Per-game settings.

use serde::{Deserialize, Serialize};

/// Grid and pacing settings for one snake game.
///
/// Every player in a match gets a game built from the same config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Grid width in cells.
    pub grid_width: u32,
    /// Grid height in cells.
    pub grid_height: u32,
    /// Number of cells in the snake at creation.
    pub initial_length: u32,
    /// Simulation step period. Only used for `elapsedTime` bookkeeping;
    /// the server's heartbeat decides when steps actually happen.
    pub tick_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 20,
            grid_height: 20,
            initial_length: 4,
            tick_interval_ms: 100,
        }
    }
}

impl GameConfig {
    /// Shorthand for a grid of the given size with default pacing.
    pub fn with_grid(grid_width: u32, grid_height: u32, initial_length: u32) -> Self {
        Self {
            grid_width,
            grid_height,
            initial_length,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_config_default() {
        let config = GameConfig::default();
        assert_eq!((config.grid_width, config.grid_height), (20, 20));
        assert_eq!(config.initial_length, 4);
    }

    #[test]
    fn test_game_config_missing_fields_take_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"grid_width": 5}"#).unwrap();
        assert_eq!(config.grid_width, 5);
        assert_eq!(config.grid_height, 20);
    }
}
