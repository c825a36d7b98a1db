//! The snakenet lobby: who plays next, when matches start and end, and
//! the per-match games.
//!
//! # Key types
//!
//! - [`LobbyServer`] — the authoritative lobby state machine
//! - [`LobbyClient`] — a player's mirror of it, with local prediction
//! - [`Match`] — per-player games and their sync servers for one match
//! - [`LobbyHandle`] — send commands to the running lobby actor
//! - [`LobbyStatus`] — lifecycle state machine
//! - [`LobbyConfig`] — slots, countdowns, tick rate and game settings
//!
//! ```text
//! WAITING_PLAYERS ─(enough ready)→ COUNTDOWN ─(0)→ PLAYING ─(≤1 alive)→ RESULTS_COUNTDOWN
//!        ↑                            │                                       │
//!        └──────(player left)─────────┘                                       │
//!        └──────────────────────────────(0)───────────────────────────────────┘
//! ```

mod actor;
mod client;
mod config;
mod error;
mod game_match;
mod outbox;
mod server;
mod simulation;

pub use actor::{LobbyHandle, LobbyInfo, spawn_lobby};
pub use client::{ClientStatus, LobbyClient};
pub use config::{LobbyConfig, LobbyStatus};
pub use error::LobbyError;
pub use game_match::{Match, MatchStep};
pub use outbox::{ChannelOutbox, ClientSender, Outbox};
pub use server::LobbyServer;
pub use simulation::SnakeSimulation;
