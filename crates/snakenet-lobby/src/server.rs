//! The server side of the lobby: membership, readiness, countdowns and
//! the match lifecycle.
//!
//! [`LobbyServer`] is a synchronous state machine. It never reads a clock
//! or spawns a timer; callers pass `now_ms` in and drive
//! [`countdown_tick`](LobbyServer::countdown_tick) (1 Hz) and
//! [`tick`](LobbyServer::tick) (heartbeat) from outside. The
//! actor behind [`spawn_lobby`](crate::spawn_lobby) does that in
//! production, tests do it by hand.

use snakenet_protocol::{ClientId, ClientInfo, ClientMessage, ServerMessage};
use snakenet_session::{ClientRegistry, ClockSample, TimeSync};
use snakenet_sim::Direction;
use snakenet_sync::InputPacket;
use snakenet_transport::ConnectionId;

use crate::{LobbyConfig, LobbyError, LobbyStatus, Match, Outbox};

/// Authoritative lobby state.
pub struct LobbyServer<O: Outbox> {
    config: LobbyConfig,
    status: LobbyStatus,
    registry: ClientRegistry,
    time_sync: TimeSync,
    /// Seconds left in the current countdown or results display.
    countdown_remaining: u32,
    /// Clients picked for the next match during COUNTDOWN.
    selected: Vec<ClientId>,
    game_match: Option<Match>,
    /// Bumped whenever a countdown (pre-match or results) begins, so a
    /// driver can re-arm its 1 Hz timer.
    countdowns_started: u64,
    outbox: O,
}

impl<O: Outbox> LobbyServer<O> {
    pub fn new(config: LobbyConfig, outbox: O) -> Self {
        let time_sync = TimeSync::new(config.time_sync_timeout_ms);
        Self {
            config,
            status: LobbyStatus::WaitingPlayers,
            registry: ClientRegistry::new(),
            time_sync,
            countdown_remaining: 0,
            selected: Vec::new(),
            game_match: None,
            countdowns_started: 0,
            outbox,
        }
    }

    // -- Inbound ---------------------------------------------------------

    /// Dispatches one decoded client message. Errors are reported to the
    /// sender as an `error` message.
    pub fn on_message(&mut self, conn: ConnectionId, msg: ClientMessage, now_ms: u64) {
        let kind = msg.kind();
        let result = match msg {
            ClientMessage::Join { name } => self.join(conn, &name).map(|_| ()),
            ClientMessage::Ready => self.ready(conn, now_ms),
            ClientMessage::Input {
                direction,
                tick_count,
                input_id,
            } => {
                self.input(
                    conn,
                    InputPacket {
                        tick: tick_count,
                        input_id: input_id.unwrap_or(tick_count),
                        payload: direction,
                    },
                );
                Ok(())
            }
            ClientMessage::TimeSyncResponse {
                request_id,
                client_time_ms,
            } => self.time_sync_response(conn, &request_id, client_time_ms, now_ms),
        };

        if let Err(e) = result {
            tracing::debug!(%conn, kind, error = %e, "request refused");
            self.outbox.send(conn, ServerMessage::error(e.to_string()));
        }
    }

    /// Registers a client name for `conn`, confirms with `joined` and
    /// broadcasts the roster.
    ///
    /// # Errors
    /// [`LobbyError::Session`] if `conn` already joined or the name is
    /// invalid.
    pub fn join(&mut self, conn: ConnectionId, name: &str) -> Result<ClientInfo, LobbyError> {
        let info = self.registry.join(conn, name, self.config.max_name_len)?;
        self.outbox.send(
            conn,
            ServerMessage::Joined {
                client_id: info.id.clone(),
                name: info.name.clone(),
            },
        );
        self.broadcast_roster();
        Ok(info)
    }

    /// Marks the client on `conn` ready and starts a countdown if enough
    /// players are.
    ///
    /// # Errors
    /// - [`LobbyError::NotJoined`] if `conn` never joined
    /// - [`LobbyError::NotAccepting`] outside WAITING_PLAYERS
    pub fn ready(&mut self, conn: ConnectionId, now_ms: u64) -> Result<(), LobbyError> {
        let id = self
            .registry
            .client_for(conn)
            .cloned()
            .ok_or(LobbyError::NotJoined(conn))?;
        if self.status != LobbyStatus::WaitingPlayers {
            return Err(LobbyError::NotAccepting(self.status));
        }
        if self.registry.mark_ready(&id)? {
            self.broadcast_roster();
            self.try_start_countdown(now_ms);
        }
        Ok(())
    }

    /// Hands an input to the sender's game. Inputs outside a match, or
    /// from clients not in it, are dropped: they are late keypresses, not
    /// errors.
    pub fn input(&mut self, conn: ConnectionId, packet: InputPacket<Direction>) {
        let accepted = match (&mut self.game_match, self.status) {
            (Some(m), LobbyStatus::Playing) => m.on_input(conn, packet.clone()),
            _ => false,
        };
        if !accepted {
            tracing::debug!(
                %conn,
                tick = packet.tick,
                input_id = packet.input_id,
                status = %self.status,
                "input dropped"
            );
        }
    }

    /// Completes a time-sync round trip and sends that player's
    /// `game_start` with the start instant on their clock.
    ///
    /// # Errors
    /// [`LobbyError::Session`] if the request is unknown or timed out.
    pub fn time_sync_response(
        &mut self,
        conn: ConnectionId,
        request_id: &str,
        client_time_ms: u64,
        now_ms: u64,
    ) -> Result<(), LobbyError> {
        let sample = self
            .time_sync
            .complete(conn, request_id, client_time_ms, now_ms)?;
        self.announce(request_id, sample);
        Ok(())
    }

    /// Forgets `conn`: fails its time syncs, removes it from every set,
    /// and cancels or ends whatever it was part of.
    pub fn disconnect(&mut self, conn: ConnectionId, now_ms: u64) {
        self.time_sync.fail_all_for(conn);
        let Some(info) = self.registry.remove_connection(conn) else {
            return;
        };

        match self.status {
            LobbyStatus::Countdown if self.selected.contains(&info.id) => {
                tracing::info!(client_id = %info.id, "player left during countdown, cancelling");
                self.selected.clear();
                self.set_status(LobbyStatus::WaitingPlayers);
                self.broadcast_roster();
                self.try_start_countdown(now_ms);
            }
            LobbyStatus::Playing => {
                let result = self.game_match.as_mut().and_then(|m| m.remove(conn));
                self.broadcast_roster();
                if let Some(winner) = result {
                    self.end_match(winner, now_ms);
                }
            }
            _ => self.broadcast_roster(),
        }
    }

    // -- Timers ----------------------------------------------------------

    /// One second passed. Counts down the pre-match or results countdown.
    pub fn countdown_tick(&mut self, now_ms: u64) {
        if !self.status.is_counting_down() {
            return;
        }
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        self.broadcast(ServerMessage::Countdown {
            seconds_remaining: self.countdown_remaining,
        });
        if self.countdown_remaining == 0 {
            match self.status {
                LobbyStatus::Countdown => self.start_game(now_ms),
                LobbyStatus::ResultsCountdown => self.finish_results(now_ms),
                _ => {}
            }
        }
    }

    /// One heartbeat. Expires overdue time syncs, then steps the match.
    pub fn tick(&mut self, now_ms: u64) {
        self.expire_time_syncs(now_ms);
        if self.status != LobbyStatus::Playing {
            return;
        }
        let Some(m) = self.game_match.as_mut() else {
            return;
        };
        let step = m.advance();
        for (conn, msg) in step.outbound {
            self.outbox.send(conn, msg);
        }
        if let Some(winner) = step.result {
            self.end_match(winner, now_ms);
        }
    }

    /// Fails every time sync past its deadline. Players whose sync failed
    /// still get `game_start`, uncorrected.
    pub fn expire_time_syncs(&mut self, now_ms: u64) {
        for (request_id, _conn) in self.time_sync.expire(now_ms) {
            self.announce(&request_id, ClockSample::ZERO);
        }
    }

    // -- Transitions -----------------------------------------------------

    fn try_start_countdown(&mut self, now_ms: u64) {
        if self.status != LobbyStatus::WaitingPlayers {
            return;
        }
        let Some(players) = self.registry.first_ready(self.config.player_slots) else {
            return;
        };
        tracing::info!(players = ?players, secs = self.config.countdown_secs, "countdown started");
        self.selected = players;
        self.set_status(LobbyStatus::Countdown);
        self.begin_countdown(self.config.countdown_secs);
        if self.countdown_remaining == 0 {
            self.start_game(now_ms);
        }
    }

    fn begin_countdown(&mut self, secs: u32) {
        self.countdown_remaining = secs;
        self.countdowns_started += 1;
        self.broadcast(ServerMessage::Countdown {
            seconds_remaining: secs,
        });
    }

    /// Builds the match, asks every player for a clock sample and starts
    /// the heartbeat. `game_start` follows per player in
    /// [`time_sync_response`](Self::time_sync_response).
    fn start_game(&mut self, now_ms: u64) {
        let players: Vec<(ClientId, ConnectionId)> = self
            .selected
            .iter()
            .filter_map(|id| self.registry.connection_of(id).map(|c| (id.clone(), c)))
            .collect();
        if players.len() != self.config.player_slots {
            tracing::warn!(have = players.len(), "not enough players to start, back to waiting");
            self.selected.clear();
            self.set_status(LobbyStatus::WaitingPlayers);
            self.try_start_countdown(now_ms);
            return;
        }

        let start_at_ms = now_ms + self.config.start_delay_ms;
        let mut game_match = match Match::new(
            &players,
            &self.config.match_game_config(),
            start_at_ms,
            self.config.max_pending_inputs,
        ) {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "cannot build match");
                for (_, conn) in &players {
                    self.outbox.send(*conn, ServerMessage::error(e.to_string()));
                }
                self.selected.clear();
                self.set_status(LobbyStatus::WaitingPlayers);
                return;
            }
        };

        for (_, conn) in &players {
            let request_id = self.time_sync.begin(*conn, now_ms);
            game_match.await_sync(*conn, request_id.clone());
            self.outbox.send(*conn, ServerMessage::TimeSyncRequest { request_id });
        }

        tracing::info!(players = ?game_match.players(), start_at_ms, "match started");
        self.game_match = Some(game_match);
        self.set_status(LobbyStatus::Playing);
    }

    fn announce(&mut self, request_id: &str, clock: ClockSample) {
        let Some(m) = self.game_match.as_mut() else {
            return;
        };
        if let Some((conn, msg)) = m.announce(request_id, clock) {
            tracing::debug!(%conn, offset_ms = clock.offset_ms, "game start sent");
            self.outbox.send(conn, msg);
        }
    }

    /// Ends the match with `winner` (`None` for a draw) and shows results.
    fn end_match(&mut self, winner: Option<ClientId>, now_ms: u64) {
        if self.status != LobbyStatus::Playing {
            return;
        }
        tracing::info!(winner = ?winner.as_ref().map(ClientId::as_str), "match over");
        self.game_match = None;
        self.selected.clear();
        self.time_sync.clear();
        self.registry.reset_ready();

        self.broadcast(ServerMessage::GameOver { winner });
        self.set_status(LobbyStatus::ResultsCountdown);
        self.begin_countdown(self.config.results_secs);
        if self.countdown_remaining == 0 {
            self.finish_results(now_ms);
        }
    }

    fn finish_results(&mut self, now_ms: u64) {
        self.set_status(LobbyStatus::WaitingPlayers);
        self.broadcast_roster();
        self.try_start_countdown(now_ms);
    }

    fn set_status(&mut self, next: LobbyStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal lobby transition {} -> {next}",
            self.status
        );
        tracing::debug!(from = %self.status, to = %next, "lobby status");
        self.status = next;
    }

    // -- Outbound --------------------------------------------------------

    fn broadcast(&mut self, msg: ServerMessage) {
        for conn in self.registry.connections() {
            self.outbox.send(conn, msg.clone());
        }
    }

    fn broadcast_roster(&mut self) {
        let clients = self.registry.roster();
        self.broadcast(ServerMessage::Clients { clients });
    }

    // -- Accessors -------------------------------------------------------

    pub fn status(&self) -> LobbyStatus {
        self.status
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    pub fn roster(&self) -> Vec<ClientInfo> {
        self.registry.roster()
    }

    /// Players in the running match, or those selected during countdown.
    pub fn players(&self) -> Vec<ClientId> {
        match &self.game_match {
            Some(m) => m.players(),
            None => self.selected.clone(),
        }
    }

    pub fn client_for(&self, conn: ConnectionId) -> Option<&ClientId> {
        self.registry.client_for(conn)
    }

    pub fn current_match(&self) -> Option<&Match> {
        self.game_match.as_ref()
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    pub fn countdowns_started(&self) -> u64 {
        self.countdowns_started
    }

    pub fn pending_time_syncs(&self) -> usize {
        self.time_sync.len()
    }

    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    pub fn outbox_mut(&mut self) -> &mut O {
        &mut self.outbox
    }
}
