//! Deterministic per-player snake simulation for snakenet.
//!
//! Server and client run the exact same code: the server to produce the
//! authoritative state, the client to predict it between snapshots. Given
//! the same state and the same inputs, [`SnakeGame::tick`] always produces
//! the same result, food placement included.
//!
//! # Key types
//!
//! - [`SnakeGame`] — one player's snake, food and score
//! - [`GameConfig`] — grid size, initial length and step period
//! - [`TickOutcome`] — what a single step did
//! - [`Direction`] / [`Position`] — grid primitives

mod config;
mod error;
mod game;
mod grid;

pub use config::GameConfig;
pub use error::SimError;
pub use game::{FOOD_SCORE, GameOverCause, GameStatus, SnakeGame, TickOutcome};
pub use grid::{Direction, Position, in_bounds, next_head};
