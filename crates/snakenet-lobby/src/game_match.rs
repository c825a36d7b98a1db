//! One running match: a snake game per player behind its own
//! authoritative sync server.

use snakenet_protocol::{ClientId, ServerMessage};
use snakenet_session::ClockSample;
use snakenet_sim::{Direction, GameConfig, SimError, SnakeGame, TickOutcome};
use snakenet_sync::{AuthorityServer, InputPacket};
use snakenet_transport::ConnectionId;

use crate::SnakeSimulation;

struct Slot {
    client_id: ClientId,
    conn: ConnectionId,
    server: AuthorityServer<SnakeSimulation>,
    /// Outstanding time-sync request for this player's `game_start`.
    sync_request: Option<String>,
    /// `game_start` went out; ticks are only sent after this.
    announced: bool,
}

/// The outcome of one heartbeat.
#[derive(Debug)]
pub struct MatchStep {
    /// `tick` messages, one per announced player.
    pub outbound: Vec<(ConnectionId, ServerMessage)>,
    /// `Some(winner)` once at most one snake is still alive.
    pub result: Option<Option<ClientId>>,
}

/// Per-player games for one match.
///
/// Each player's game is independent; the only coupling is that every
/// heartbeat steps all of them before anything is sent, and each player's
/// `tick` message carries the next player's state as the opponent.
pub struct Match {
    slots: Vec<Slot>,
    start_at_ms: u64,
}

impl Match {
    /// Builds fresh games for `players`, started at `start_at_ms` on the
    /// server clock. Each player may have at most `max_queued` inputs
    /// waiting.
    ///
    /// # Errors
    /// [`SimError::InvalidConfiguration`] if `config` cannot produce a game.
    pub fn new(
        players: &[(ClientId, ConnectionId)],
        config: &GameConfig,
        start_at_ms: u64,
        max_queued: usize,
    ) -> Result<Self, SimError> {
        let slots = players
            .iter()
            .map(|(client_id, conn)| {
                let mut game = SnakeGame::create(config)?;
                game.start(start_at_ms);
                Ok(Slot {
                    client_id: client_id.clone(),
                    conn: *conn,
                    server: AuthorityServer::with_limits(
                        game,
                        AuthorityServer::<SnakeSimulation>::DEFAULT_HORIZON_TICKS,
                        max_queued,
                    ),
                    sync_request: None,
                    announced: false,
                })
            })
            .collect::<Result<Vec<_>, SimError>>()?;
        Ok(Self { slots, start_at_ms })
    }

    pub fn start_at_ms(&self) -> u64 {
        self.start_at_ms
    }

    pub fn players(&self) -> Vec<ClientId> {
        self.slots.iter().map(|s| s.client_id.clone()).collect()
    }

    pub fn connections(&self) -> Vec<ConnectionId> {
        self.slots.iter().map(|s| s.conn).collect()
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.slot_of(conn).is_some()
    }

    fn slot_of(&self, conn: ConnectionId) -> Option<usize> {
        self.slots.iter().position(|s| s.conn == conn)
    }

    /// The slot whose state is shown to slot `i` as the opponent.
    fn opponent_index(&self, i: usize) -> usize {
        (i + 1) % self.slots.len()
    }

    /// Current authoritative state of the player on `conn`.
    pub fn state_of(&self, conn: ConnectionId) -> Option<&SnakeGame> {
        self.slot_of(conn).map(|i| self.slots[i].server.state())
    }

    // -- Start handshake -------------------------------------------------

    /// Remembers the time-sync request sent to `conn` for its start.
    pub fn await_sync(&mut self, conn: ConnectionId, request_id: String) {
        if let Some(i) = self.slot_of(conn) {
            self.slots[i].sync_request = Some(request_id);
        }
    }

    /// Resolves a pending start: builds `game_start` for the player whose
    /// sync request was `request_id`, with the start instant translated
    /// by `clock`. `None` if no player is waiting on that request.
    pub fn announce(
        &mut self,
        request_id: &str,
        clock: ClockSample,
    ) -> Option<(ConnectionId, ServerMessage)> {
        let i = self
            .slots
            .iter()
            .position(|s| s.sync_request.as_deref() == Some(request_id))?;
        let opponent_state = self.slots[self.opponent_index(i)].server.state().clone();
        let start_time_ms = clock.to_remote(self.start_at_ms);

        let slot = &mut self.slots[i];
        slot.sync_request = None;
        slot.announced = true;
        let msg = ServerMessage::GameStart {
            start_time_ms,
            player_state: slot.server.state().clone(),
            opponent_state,
        };
        Some((slot.conn, msg))
    }

    // -- Play ------------------------------------------------------------

    /// Queues an input from `conn`. Returns `false` if `conn` is not
    /// playing or the input is a duplicate.
    pub fn on_input(&mut self, conn: ConnectionId, packet: InputPacket<Direction>) -> bool {
        match self.slot_of(conn) {
            Some(i) => self.slots[i].server.on_client_input(packet),
            None => false,
        }
    }

    /// Steps every player's game once, then builds the `tick` messages.
    pub fn advance(&mut self) -> MatchStep {
        let packets: Vec<_> = self
            .slots
            .iter_mut()
            .map(|slot| {
                let (packet, outcome) = slot.server.advance_tick();
                if let TickOutcome::Terminated(cause) = outcome {
                    tracing::info!(client_id = %slot.client_id, ?cause, "snake eliminated");
                }
                packet
            })
            .collect();

        let outbound = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.announced)
            .map(|(i, slot)| {
                let own = &packets[i];
                let opponent = &packets[self.opponent_index(i)];
                (
                    slot.conn,
                    ServerMessage::Tick {
                        tick_count: own.tick,
                        last_processed_input_id: own.last_processed_input_id,
                        player_state: own.state.clone(),
                        opponent_state: opponent.state.clone(),
                    },
                )
            })
            .collect();

        MatchStep {
            outbound,
            result: self.result(),
        }
    }

    /// Drops the player on `conn`. Returns the match result if that
    /// leaves at most one snake alive.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<Option<ClientId>> {
        let i = self.slot_of(conn)?;
        let slot = self.slots.remove(i);
        tracing::info!(client_id = %slot.client_id, "player left the match");
        self.result()
    }

    /// `Some(winner)` when at most one snake is alive: the survivor, or
    /// `None` if nobody survived.
    fn result(&self) -> Option<Option<ClientId>> {
        let mut alive = self.slots.iter().filter(|s| !s.server.state().is_over());
        match (alive.next(), alive.next()) {
            (Some(_), Some(_)) => None,
            (Some(winner), None) => Some(Some(winner.client_id.clone())),
            (None, _) => Some(None),
        }
    }
}
