//! Lobby actor: one Tokio task that owns the [`LobbyServer`] and its
//! timers.
//!
//! Connection handlers talk to it through a [`LobbyHandle`]; outbound
//! messages go back over each connection's [`ClientSender`]. The actor
//! is the only thing that reads the wall clock or sleeps.

use std::time::Duration;

use snakenet_protocol::{ClientId, ClientInfo, ClientMessage};
use snakenet_session::unix_time_ms;
use snakenet_tick::{TickConfig, TickPolicy, TickScheduler};
use snakenet_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{ChannelOutbox, ClientSender, LobbyConfig, LobbyError, LobbyServer, LobbyStatus};

/// Commands sent to the lobby actor through its channel.
pub(crate) enum LobbyCommand {
    /// A transport connection opened. Messages for it go to `sender`.
    Connect {
        conn: ConnectionId,
        sender: ClientSender,
    },

    /// A decoded message from a connection.
    Message {
        conn: ConnectionId,
        msg: ClientMessage,
    },

    /// The connection closed or errored.
    Disconnect { conn: ConnectionId },

    /// Request a snapshot of the lobby.
    GetInfo { reply: oneshot::Sender<LobbyInfo> },

    Shutdown,
}

/// A snapshot of lobby metadata.
#[derive(Debug, Clone)]
pub struct LobbyInfo {
    pub status: LobbyStatus,
    /// Joined clients in join order.
    pub clients: Vec<ClientInfo>,
    /// Selected or playing clients.
    pub players: Vec<ClientId>,
    /// Open connections, joined or not.
    pub connections: usize,
}

/// Handle to the running lobby actor. Cheap to clone.
#[derive(Clone)]
pub struct LobbyHandle {
    sender: mpsc::Sender<LobbyCommand>,
}

impl LobbyHandle {
    /// Registers a new connection and where its messages should go.
    pub async fn connect(&self, conn: ConnectionId, sender: ClientSender) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Connect { conn, sender }).await
    }

    /// Delivers a client message (fire-and-forget).
    pub async fn send_message(&self, conn: ConnectionId, msg: ClientMessage) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Message { conn, msg }).await
    }

    /// Reports that a connection is gone.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Disconnect { conn }).await
    }

    pub async fn info(&self) -> Result<LobbyInfo, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| LobbyError::Unavailable)
    }

    /// Tells the lobby to stop. Outstanding connections are not closed.
    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Shutdown).await
    }

    async fn send(&self, cmd: LobbyCommand) -> Result<(), LobbyError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| LobbyError::Unavailable)
    }
}

struct LobbyActor {
    lobby: LobbyServer<ChannelOutbox>,
    /// Match heartbeat; runs only while PLAYING.
    heartbeat: TickScheduler,
    /// 1 Hz; runs only during the pre-match and results countdowns.
    countdown: TickScheduler,
    /// The countdown the 1 Hz timer is currently armed for.
    armed_countdown: u64,
    receiver: mpsc::Receiver<LobbyCommand>,
}

impl LobbyActor {
    async fn run(mut self) {
        tracing::info!(
            slots = self.lobby.config().player_slots,
            tick_rate_hz = self.lobby.config().tick_rate_hz,
            "lobby actor started"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(LobbyCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle(cmd),
                },
                _ = self.heartbeat.wait_for_tick() => {
                    self.lobby.tick(unix_time_ms());
                    self.heartbeat.record_tick_end();
                }
                _ = self.countdown.wait_for_tick() => {
                    self.lobby.countdown_tick(unix_time_ms());
                }
            }
            self.sync_timers();
        }

        tracing::info!("lobby actor stopped");
    }

    fn handle(&mut self, cmd: LobbyCommand) {
        let now_ms = unix_time_ms();
        match cmd {
            LobbyCommand::Connect { conn, sender } => {
                tracing::debug!(%conn, "connection registered");
                self.lobby.outbox_mut().register(conn, sender);
            }
            LobbyCommand::Message { conn, msg } => {
                self.lobby.on_message(conn, msg, now_ms);
            }
            LobbyCommand::Disconnect { conn } => {
                tracing::debug!(%conn, "connection gone");
                self.lobby.disconnect(conn, now_ms);
                self.lobby.outbox_mut().unregister(conn);
            }
            LobbyCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            LobbyCommand::Shutdown => {}
        }
    }

    /// Starts and stops the two timers to follow the lobby status.
    fn sync_timers(&mut self) {
        let status = self.lobby.status();

        if status == LobbyStatus::Playing {
            if self.heartbeat.is_paused() {
                let config = self.lobby.config();
                let first = Duration::from_millis(config.start_delay_ms) + config.tick_period();
                self.heartbeat.resume_after(first);
            }
        } else {
            self.heartbeat.pause();
        }

        if status.is_counting_down() {
            let serial = self.lobby.countdowns_started();
            if serial != self.armed_countdown {
                self.countdown.pause();
                self.countdown.resume();
                self.armed_countdown = serial;
            }
        } else {
            self.countdown.pause();
        }
    }

    fn info(&self) -> LobbyInfo {
        LobbyInfo {
            status: self.lobby.status(),
            clients: self.lobby.roster(),
            players: self.lobby.players(),
            connections: self.lobby.outbox().len(),
        }
    }
}

/// Spawns the lobby actor and returns a handle to it.
///
/// `channel_size` bounds the command queue; handlers wait when it is
/// full.
pub fn spawn_lobby(config: LobbyConfig, channel_size: usize) -> LobbyHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    // Clients predict by wall clock from the start instant, so a late
    // heartbeat must not shift the ones after it.
    let heartbeat = TickScheduler::paused(TickConfig {
        policy: TickPolicy::Drop,
        ..TickConfig::with_rate(config.tick_rate_hz)
    });
    let countdown = TickScheduler::paused(TickConfig::with_rate(1));
    let actor = LobbyActor {
        lobby: LobbyServer::new(config, ChannelOutbox::default()),
        heartbeat,
        countdown,
        armed_countdown: 0,
        receiver: rx,
    };
    tokio::spawn(actor.run());
    LobbyHandle { sender: tx }
}
