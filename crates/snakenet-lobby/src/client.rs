//! The client side of the lobby.
//!
//! [`LobbyClient`] mirrors the server's lobby with a slightly finer status
//! and owns the player's predicted game. It is transport-free: feed it
//! decoded [`ServerMessage`]s, send whatever [`ClientMessage`]s it returns.

use snakenet_protocol::{ClientId, ClientInfo, ClientMessage, ServerMessage};
use snakenet_sim::{Direction, SnakeGame};
use snakenet_sync::{PredictionClient, StatePacket};

use crate::SnakeSimulation;

/// Where this client is in the lobby cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    ChoosingName,
    NotReady,
    Ready,
    Countdown,
    Playing,
    ResultsCountdown,
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChoosingName => write!(f, "CHOOSING_NAME"),
            Self::NotReady => write!(f, "NOT_READY"),
            Self::Ready => write!(f, "READY"),
            Self::Countdown => write!(f, "COUNTDOWN"),
            Self::Playing => write!(f, "PLAYING"),
            Self::ResultsCountdown => write!(f, "RESULTS_COUNTDOWN"),
        }
    }
}

/// Lobby mirror plus local prediction for one player.
pub struct LobbyClient {
    status: ClientStatus,
    client_id: Option<ClientId>,
    roster: Vec<ClientInfo>,
    seconds_remaining: Option<u32>,
    prediction: Option<PredictionClient<SnakeSimulation>>,
    opponent: Option<SnakeGame>,
    /// Match start on this client's clock.
    start_time_ms: Option<u64>,
    winner: Option<Option<ClientId>>,
    last_error: Option<String>,
    max_pending_inputs: usize,
}

impl LobbyClient {
    pub fn new(max_pending_inputs: usize) -> Self {
        Self {
            status: ClientStatus::ChoosingName,
            client_id: None,
            roster: Vec::new(),
            seconds_remaining: None,
            prediction: None,
            opponent: None,
            start_time_ms: None,
            winner: None,
            last_error: None,
            max_pending_inputs,
        }
    }

    // -- Outbound --------------------------------------------------------

    /// The `join` request for `name`.
    pub fn join_server(&mut self, name: &str) -> ClientMessage {
        ClientMessage::Join {
            name: name.to_owned(),
        }
    }

    /// The `ready` request, if this client is in a state to send one.
    pub fn press_ready(&mut self) -> Option<ClientMessage> {
        if self.status != ClientStatus::NotReady {
            return None;
        }
        self.status = ClientStatus::Ready;
        Some(ClientMessage::Ready)
    }

    /// Applies a key press to the predicted game and returns the `input`
    /// to send. `None` outside a match or when too many inputs are still
    /// unacknowledged.
    pub fn handle_direction_input(&mut self, direction: Direction) -> Option<ClientMessage> {
        if self.status != ClientStatus::Playing {
            return None;
        }
        let prediction = self.prediction.as_mut()?;
        match prediction.submit_input(direction) {
            Ok(packet) => Some(ClientMessage::Input {
                direction: packet.payload,
                tick_count: packet.tick,
                input_id: Some(packet.input_id),
            }),
            Err(e) => {
                tracing::warn!(%direction, error = %e, "key press dropped");
                None
            }
        }
    }

    /// Advances the prediction to wherever the match should be at
    /// `now_ms`. Returns the number of steps simulated.
    pub fn tick(&mut self, now_ms: u64) -> u64 {
        let (Some(prediction), Some(start)) = (self.prediction.as_mut(), self.start_time_ms) else {
            return 0;
        };
        let interval = prediction.state().tick_interval_ms().max(1);
        let target = now_ms.saturating_sub(start) / interval;
        prediction.fast_forward(target)
    }

    // -- Inbound ---------------------------------------------------------

    /// Reacts to one server message. Returns a reply to send, if any.
    pub fn on_server_message(&mut self, msg: ServerMessage, now_ms: u64) -> Option<ClientMessage> {
        match msg {
            ServerMessage::Joined { client_id, name } => {
                tracing::debug!(%client_id, name = %name, "joined");
                self.client_id = Some(client_id);
                self.status = ClientStatus::NotReady;
            }
            ServerMessage::Clients { clients } => {
                self.roster = clients;
                self.on_roster();
            }
            ServerMessage::Countdown { seconds_remaining } => {
                self.seconds_remaining = Some(seconds_remaining);
                if self.status == ClientStatus::Ready {
                    self.status = ClientStatus::Countdown;
                }
            }
            ServerMessage::GameStart {
                start_time_ms,
                player_state,
                opponent_state,
            } => {
                if let Err(reason) = player_state
                    .check_invariants()
                    .and_then(|()| opponent_state.check_invariants())
                {
                    tracing::warn!(%reason, "dropping malformed game_start");
                    return None;
                }
                // The server may have stepped the game while our clock
                // sample was in flight.
                let tick = player_state.tick_count();
                self.prediction = Some(PredictionClient::starting_at(
                    player_state,
                    tick,
                    self.max_pending_inputs,
                ));
                self.opponent = Some(opponent_state);
                self.start_time_ms = Some(start_time_ms);
                self.seconds_remaining = None;
                self.winner = None;
                self.status = ClientStatus::Playing;
            }
            ServerMessage::Tick {
                tick_count,
                last_processed_input_id,
                player_state,
                opponent_state,
            } => {
                if let Err(reason) = player_state
                    .check_invariants()
                    .and_then(|()| opponent_state.check_invariants())
                {
                    tracing::warn!(tick_count, %reason, "dropping malformed tick");
                    return None;
                }
                if let Some(prediction) = self.prediction.as_mut() {
                    prediction.on_server_state(StatePacket {
                        tick: tick_count,
                        last_processed_input_id,
                        state: player_state,
                    });
                }
                self.opponent = Some(opponent_state);
            }
            ServerMessage::GameOver { winner } => {
                self.winner = Some(winner);
                self.seconds_remaining = None;
                self.status = ClientStatus::ResultsCountdown;
            }
            ServerMessage::TimeSyncRequest { request_id } => {
                return Some(ClientMessage::TimeSyncResponse {
                    request_id,
                    client_time_ms: now_ms,
                });
            }
            ServerMessage::Error { message } => {
                tracing::warn!(message = %message, "server error");
                self.last_error = Some(message);
            }
        }
        None
    }

    /// Follows the server's view of our ready flag.
    fn on_roster(&mut self) {
        let Some(ready) = self.own_entry().map(|c| c.ready) else {
            return;
        };
        self.status = match (self.status, ready) {
            // Countdown cancelled, still queued.
            (ClientStatus::Countdown, true) => ClientStatus::Ready,
            (ClientStatus::ResultsCountdown, false) => ClientStatus::NotReady,
            (ClientStatus::NotReady, true) => ClientStatus::Ready,
            (status, _) => status,
        };
    }

    fn own_entry(&self) -> Option<&ClientInfo> {
        let id = self.client_id.as_ref()?;
        self.roster.iter().find(|c| &c.id == id)
    }

    // -- Accessors -------------------------------------------------------

    pub fn status(&self) -> ClientStatus {
        self.status
    }

    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    pub fn roster(&self) -> &[ClientInfo] {
        &self.roster
    }

    pub fn seconds_remaining(&self) -> Option<u32> {
        self.seconds_remaining
    }

    /// The locally predicted game, during and after a match.
    pub fn game(&self) -> Option<&SnakeGame> {
        self.prediction.as_ref().map(|p| p.state())
    }

    pub fn prediction(&self) -> Option<&PredictionClient<SnakeSimulation>> {
        self.prediction.as_ref()
    }

    /// The last opponent state the server sent.
    pub fn opponent(&self) -> Option<&SnakeGame> {
        self.opponent.as_ref()
    }

    pub fn start_time_ms(&self) -> Option<u64> {
        self.start_time_ms
    }

    /// `Some(winner)` once a match has ended; the inner `None` is a draw.
    pub fn winner(&self) -> Option<&Option<ClientId>> {
        self.winner.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snakenet_sim::GameConfig;

    fn joined(client: &mut LobbyClient, id: &str) {
        client.join_server("ann");
        client.on_server_message(
            ServerMessage::Joined {
                client_id: ClientId::new(id),
                name: "ann".into(),
            },
            0,
        );
    }

    fn roster(id: &str, ready: bool) -> ServerMessage {
        ServerMessage::Clients {
            clients: vec![ClientInfo {
                id: ClientId::new(id),
                name: "ann".into(),
                ready,
            }],
        }
    }

    fn started_game() -> SnakeGame {
        let mut game = SnakeGame::create_seeded(&GameConfig::default(), 1).unwrap();
        game.start(0);
        game
    }

    fn playing_client() -> LobbyClient {
        let mut client = LobbyClient::new(4);
        joined(&mut client, "a");
        client.press_ready();
        client.on_server_message(
            ServerMessage::GameStart {
                start_time_ms: 1_000,
                player_state: started_game(),
                opponent_state: started_game(),
            },
            900,
        );
        client
    }

    #[test]
    fn test_join_then_joined_moves_to_not_ready() {
        let mut client = LobbyClient::new(4);
        assert_eq!(client.status(), ClientStatus::ChoosingName);
        let msg = client.join_server("ann");
        assert_eq!(msg, ClientMessage::Join { name: "ann".into() });
        joined(&mut client, "a");
        assert_eq!(client.status(), ClientStatus::NotReady);
        assert_eq!(client.client_id(), Some(&ClientId::new("a")));
    }

    #[test]
    fn test_press_ready_only_from_not_ready() {
        let mut client = LobbyClient::new(4);
        assert!(client.press_ready().is_none());
        joined(&mut client, "a");
        assert_eq!(client.press_ready(), Some(ClientMessage::Ready));
        assert_eq!(client.status(), ClientStatus::Ready);
        assert!(client.press_ready().is_none());
    }

    #[test]
    fn test_countdown_cancel_returns_to_ready() {
        let mut client = LobbyClient::new(4);
        joined(&mut client, "a");
        client.press_ready();
        client.on_server_message(ServerMessage::Countdown { seconds_remaining: 3 }, 0);
        assert_eq!(client.status(), ClientStatus::Countdown);
        client.on_server_message(roster("a", true), 0);
        assert_eq!(client.status(), ClientStatus::Ready);
    }

    #[test]
    fn test_results_then_unready_roster_resets_to_not_ready() {
        let mut client = playing_client();
        client.on_server_message(ServerMessage::GameOver { winner: None }, 0);
        assert_eq!(client.status(), ClientStatus::ResultsCountdown);
        assert_eq!(client.winner(), Some(&None));

        client.on_server_message(ServerMessage::Countdown { seconds_remaining: 2 }, 0);
        assert_eq!(client.status(), ClientStatus::ResultsCountdown);
        client.on_server_message(roster("a", false), 0);
        assert_eq!(client.status(), ClientStatus::NotReady);
    }

    #[test]
    fn test_time_sync_request_answered_with_local_time() {
        let mut client = LobbyClient::new(4);
        let reply = client.on_server_message(
            ServerMessage::TimeSyncRequest {
                request_id: "r1".into(),
            },
            4_242,
        );
        assert_eq!(
            reply,
            Some(ClientMessage::TimeSyncResponse {
                request_id: "r1".into(),
                client_time_ms: 4_242,
            })
        );
    }

    #[test]
    fn test_direction_input_predicts_and_numbers_inputs() {
        let mut client = playing_client();
        assert_eq!(client.status(), ClientStatus::Playing);
        let msg = client.handle_direction_input(Direction::Up).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Input {
                direction: Direction::Up,
                tick_count: 0,
                input_id: Some(1),
            }
        );
        assert_eq!(client.game().unwrap().queued_directions().0, Some(Direction::Up));
    }

    #[test]
    fn test_direction_input_outside_match_is_ignored() {
        let mut client = LobbyClient::new(4);
        joined(&mut client, "a");
        assert!(client.handle_direction_input(Direction::Up).is_none());
    }

    #[test]
    fn test_direction_input_backlogged_is_dropped() {
        let mut client = playing_client();
        for _ in 0..4 {
            assert!(client.handle_direction_input(Direction::Up).is_some());
        }
        assert!(client.handle_direction_input(Direction::Up).is_none());
        assert_eq!(client.prediction().unwrap().pending_inputs().len(), 4);
    }

    #[test]
    fn test_tick_follows_local_clock_from_start() {
        let mut client = playing_client();
        assert_eq!(client.tick(500), 0, "before start nothing moves");
        assert_eq!(client.tick(1_000), 0);
        assert_eq!(client.tick(1_350), 3);
        assert_eq!(client.game().unwrap().tick_count(), 3);
        assert_eq!(client.tick(1_350), 0);
    }

    #[test]
    fn test_tick_message_reconciles_and_mirrors_opponent() {
        let mut client = playing_client();
        client.handle_direction_input(Direction::Up);

        let mut authoritative = started_game();
        authoritative.queue_direction(Direction::Up);
        let _ = authoritative.tick();
        let mut opponent = started_game();
        let _ = opponent.tick();

        client.on_server_message(
            ServerMessage::Tick {
                tick_count: 1,
                last_processed_input_id: Some(1),
                player_state: authoritative.clone(),
                opponent_state: opponent.clone(),
            },
            0,
        );
        assert_eq!(client.game(), Some(&authoritative));
        assert!(client.prediction().unwrap().pending_inputs().is_empty());
        assert_eq!(client.opponent(), Some(&opponent));
    }

    fn hollow_game() -> SnakeGame {
        let mut value = serde_json::to_value(started_game()).unwrap();
        value["snake"] = serde_json::json!([]);
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_game_start_after_server_stepped_predicts_from_its_tick() {
        let mut player_state =
            SnakeGame::create_seeded(&GameConfig::with_grid(100, 20, 4), 1).unwrap();
        player_state.start(0);
        for _ in 0..21 {
            let _ = player_state.tick();
        }
        let mut client = LobbyClient::new(4);
        joined(&mut client, "a");
        client.press_ready();
        client.on_server_message(
            ServerMessage::GameStart {
                start_time_ms: 1_000,
                player_state,
                opponent_state: started_game(),
            },
            3_000,
        );
        assert_eq!(client.prediction().unwrap().current_tick(), 21);
        // 2150ms after start is tick 21: nothing to catch up.
        assert_eq!(client.tick(3_150), 0);
        assert_eq!(client.tick(3_250), 1);
        assert_eq!(client.game().unwrap().tick_count(), 22);
    }

    #[test]
    fn test_game_start_with_malformed_state_is_dropped() {
        let mut client = LobbyClient::new(4);
        joined(&mut client, "a");
        client.press_ready();
        let reply = client.on_server_message(
            ServerMessage::GameStart {
                start_time_ms: 1_000,
                player_state: hollow_game(),
                opponent_state: started_game(),
            },
            900,
        );
        assert!(reply.is_none());
        assert_eq!(client.status(), ClientStatus::Ready);
        assert!(client.game().is_none());
    }

    #[test]
    fn test_tick_with_malformed_state_keeps_prediction() {
        let mut client = playing_client();
        let before = client.game().cloned();
        client.on_server_message(
            ServerMessage::Tick {
                tick_count: 1,
                last_processed_input_id: None,
                player_state: started_game(),
                opponent_state: hollow_game(),
            },
            0,
        );
        assert_eq!(client.game().cloned(), before);
        assert_eq!(client.prediction().unwrap().current_tick(), 0);
        assert_eq!(client.opponent(), Some(&started_game()));
    }

    #[test]
    fn test_error_is_recorded() {
        let mut client = LobbyClient::new(4);
        client.on_server_message(ServerMessage::error("nope"), 0);
        assert_eq!(client.last_error(), Some("nope"));
    }
}
