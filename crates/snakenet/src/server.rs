//! `SnakenetServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → lobby actor.

use std::sync::Arc;
use std::time::Duration;

use snakenet_lobby::{LobbyConfig, LobbyHandle, spawn_lobby};
use snakenet_protocol::{Codec, JsonCodec};
use snakenet_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ServerConfig, SnakenetError};

/// Shared state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) lobby: LobbyHandle,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a snakenet server.
///
/// ```rust,ignore
/// let server = SnakenetServer::builder()
///     .bind("0.0.0.0:8080")
///     .tick_rate(20)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct SnakenetServerBuilder {
    config: ServerConfig,
}

impl SnakenetServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    pub fn lobby_config(mut self, lobby: LobbyConfig) -> Self {
        self.config.lobby = lobby;
        self
    }

    /// Sets the match heartbeat in Hz.
    pub fn tick_rate(mut self, hz: u32) -> Self {
        self.config.lobby.tick_rate_hz = hz;
        self
    }

    /// Validates the config, binds the listener and starts the lobby.
    ///
    /// Uses [`JsonCodec`] and [`WebSocketTransport`].
    ///
    /// # Errors
    /// [`SnakenetError::Config`] for an invalid config,
    /// [`SnakenetError::Transport`] if the address can't be bound.
    pub async fn build(self) -> Result<SnakenetServer<JsonCodec>, SnakenetError> {
        self.config.validate()?;
        let transport = WebSocketTransport::bind(&self.config.bind).await?;
        let lobby = spawn_lobby(self.config.lobby.clone(), self.config.lobby_channel_size);

        let state = Arc::new(ServerState {
            lobby,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout(),
        });
        Ok(SnakenetServer { transport, state })
    }
}

impl Default for SnakenetServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound snakenet server. Call [`run()`](Self::run) to start accepting
/// connections.
pub struct SnakenetServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl SnakenetServer<JsonCodec> {
    pub fn builder() -> SnakenetServerBuilder {
        SnakenetServerBuilder::new()
    }
}

impl<C: Codec> SnakenetServer<C> {
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The running lobby, for inspection.
    pub fn lobby(&self) -> &LobbyHandle {
        &self.state.lobby
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), SnakenetError> {
        tracing::info!(addr = ?self.local_addr().ok(), "snakenet server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
