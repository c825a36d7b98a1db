//! Client-side prediction and server reconciliation for snakenet.
//!
//! Nothing in this crate knows about snakes. A game plugs in by
//! implementing [`Simulation`]; the same two types then drive it on
//! either side of the wire:
//!
//! ```text
//!  PredictionClient                         AuthorityServer
//!  ────────────────                         ───────────────
//!  submit_input ──── InputPacket ────────→  on_client_input
//!    (applied locally at once)                (queued for its tick)
//!  advance_tick                             advance_tick
//!  on_server_state ←── StatePacket ───────    (applies queue, steps)
//!    (snap + replay unacked inputs)
//! ```
//!
//! # Key types
//!
//! - [`Simulation`] — the hooks a game implements
//! - [`PredictionClient`] — optimistic local copy with pending inputs
//! - [`AuthorityServer`] — the authoritative copy and its input queue
//! - [`InputPacket`] / [`StatePacket`] — what crosses the wire

mod client;
mod error;
mod packet;
mod server;
mod simulation;

pub use client::PredictionClient;
pub use error::SyncError;
pub use packet::{InputPacket, StatePacket};
pub use server::AuthorityServer;
pub use simulation::Simulation;
