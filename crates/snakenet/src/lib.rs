//! # Snakenet
//!
//! Authoritative-server multiplayer snake with client-side prediction.
//!
//! The server owns every player's game; clients predict their own snake
//! locally and reconcile against the server's ticks. This crate wires the
//! layers together: WebSocket transport → JSON protocol → lobby actor.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snakenet::prelude::*;
//!
//! # async fn run() -> Result<(), SnakenetError> {
//! let server = SnakenetServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::SnakenetError;
pub use server::{SnakenetServer, SnakenetServerBuilder};

pub mod prelude {
    pub use crate::{ConfigError, ServerConfig, SnakenetError, SnakenetServer, SnakenetServerBuilder};
    pub use snakenet_lobby::{
        ClientStatus, LobbyClient, LobbyConfig, LobbyError, LobbyHandle, LobbyInfo, LobbyServer,
        LobbyStatus, SnakeSimulation,
    };
    pub use snakenet_protocol::{
        ClientId, ClientInfo, ClientMessage, Codec, JsonCodec, ProtocolError, ServerMessage,
    };
    pub use snakenet_session::ClockSample;
    pub use snakenet_sim::{
        Direction, GameConfig, GameOverCause, GameStatus, Position, SnakeGame, TickOutcome,
    };
    pub use snakenet_sync::{AuthorityServer, InputPacket, PredictionClient, Simulation, StatePacket};
    pub use snakenet_tick::{TickConfig, TickScheduler};
    pub use snakenet_transport::{ConnectionId, TransportError};
}
