//! Message types for snakenet's wire format.
//!
//! Both enums are internally tagged (`"type": "..."`) with snake_case tags
//! and camelCase fields, which is what browser clients expect.

use std::fmt;

use serde::{Deserialize, Serialize};
use snakenet_sim::{Direction, SnakeGame};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A server-assigned identifier for a joined client.
///
/// Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: ClientId,
    pub name: String,
    pub ready: bool,
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Everything a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Pick a display name and enter the lobby.
    Join { name: String },

    /// Ready for the next match.
    Ready,

    /// A turn, stamped with the client's predicted tick.
    ///
    /// Older clients send only `tickCount`; the server then uses it as the
    /// input id as well.
    Input {
        direction: Direction,
        tick_count: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input_id: Option<u64>,
    },

    /// Answer to a [`ServerMessage::TimeSyncRequest`], carrying the
    /// client's clock at the moment of sending.
    TimeSyncResponse { request_id: String, client_time_ms: u64 },
}

impl ClientMessage {
    /// The wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Ready => "ready",
            Self::Input { .. } => "input",
            Self::TimeSyncResponse { .. } => "time_sync_response",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Everything the server can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Reply to `join` with the id the server assigned.
    Joined { client_id: ClientId, name: String },

    /// The full roster, sent on every membership or readiness change.
    Clients { clients: Vec<ClientInfo> },

    /// Seconds until the match starts, or until the lobby reopens after
    /// results.
    Countdown { seconds_remaining: u32 },

    /// The match is on. `start_time_ms` is on the receiving client's clock.
    GameStart {
        start_time_ms: u64,
        player_state: SnakeGame,
        opponent_state: SnakeGame,
    },

    /// Authoritative states after one server tick.
    Tick {
        tick_count: u64,
        last_processed_input_id: Option<u64>,
        player_state: SnakeGame,
        opponent_state: SnakeGame,
    },

    /// The match ended. `winner` is `null` on a draw.
    GameOver { winner: Option<ClientId> },

    /// Asks the client to echo its clock.
    TimeSyncRequest { request_id: String },

    /// Something the client sent was refused.
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Joined { .. } => "joined",
            Self::Clients { .. } => "clients",
            Self::Countdown { .. } => "countdown",
            Self::GameStart { .. } => "game_start",
            Self::Tick { .. } => "tick",
            Self::GameOver { .. } => "game_over",
            Self::TimeSyncRequest { .. } => "time_sync_request",
            Self::Error { .. } => "error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
