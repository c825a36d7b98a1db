//! Integration tests for the snakenet server: real WebSocket clients
//! against a server on an OS-assigned port.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use snakenet::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn fast_lobby() -> LobbyConfig {
    LobbyConfig {
        countdown_secs: 1,
        results_secs: 1,
        tick_rate_hz: 20,
        start_delay_ms: 50,
        // Wide enough that nobody hits a wall before the test is done.
        game: GameConfig::with_grid(100, 100, 4),
        ..LobbyConfig::default()
    }
}

/// Starts a server on a random port and returns the address.
async fn start_server(lobby: LobbyConfig) -> String {
    let server = SnakenetServer::builder()
        .bind("127.0.0.1:0")
        .lobby_config(lobby)
        .build()
        .await
        .expect("server should build");

    let addr = server.local_addr().expect("should have local addr").to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, msg: &ClientMessage) {
    let text = serde_json::to_string(msg).expect("encode");
    ws.send(Message::text(text)).await.expect("send");
}

async fn recv(ws: &mut ClientWs) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("server should answer within 5s")
            .expect("stream should stay open")
            .expect("frame should be valid");
        if frame.is_text() || frame.is_binary() {
            return serde_json::from_slice(&frame.into_data()).expect("decode server message");
        }
    }
}

async fn recv_until(ws: &mut ClientWs, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
    loop {
        let msg = recv(ws).await;
        if pred(&msg) {
            return msg;
        }
    }
}

async fn join(ws: &mut ClientWs, name: &str) -> ClientId {
    send(ws, &ClientMessage::Join { name: name.into() }).await;
    match recv_until(ws, |m| matches!(m, ServerMessage::Joined { .. })).await {
        ServerMessage::Joined { client_id, .. } => client_id,
        _ => unreachable!(),
    }
}

/// Answers the start handshake and returns the `game_start` contents.
async fn sync_and_start(ws: &mut ClientWs) -> (u64, SnakeGame) {
    let request_id =
        match recv_until(ws, |m| matches!(m, ServerMessage::TimeSyncRequest { .. })).await {
            ServerMessage::TimeSyncRequest { request_id } => request_id,
            _ => unreachable!(),
        };
    let reply = ClientMessage::TimeSyncResponse {
        request_id,
        client_time_ms: snakenet_session::unix_time_ms(),
    };
    send(ws, &reply).await;
    match recv_until(ws, |m| matches!(m, ServerMessage::GameStart { .. })).await {
        ServerMessage::GameStart {
            start_time_ms,
            player_state,
            ..
        } => (start_time_ms, player_state),
        _ => unreachable!(),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_join_is_confirmed_and_roster_broadcast() {
    let addr = start_server(fast_lobby()).await;
    let mut ann = connect(&addr).await;
    let mut bob = connect(&addr).await;

    let ann_id = join(&mut ann, "ann").await;
    join(&mut bob, "bob").await;

    let roster = recv_until(&mut ann, |m| {
        matches!(m, ServerMessage::Clients { clients } if clients.len() == 2)
    })
    .await;
    let ServerMessage::Clients { clients } = roster else {
        unreachable!()
    };
    assert_eq!(clients[0].id, ann_id);
    assert_eq!(clients[1].name, "bob");
    assert!(clients.iter().all(|c| !c.ready));
}

#[tokio::test]
async fn test_malformed_message_is_dropped_and_connection_survives() {
    let addr = start_server(fast_lobby()).await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("{not json")).await.unwrap();
    ws.send(Message::text(r#"{"type":"teleport"}"#)).await.unwrap();
    let id = join(&mut ws, "ann").await;
    assert!(!id.as_str().is_empty());
}

#[tokio::test]
async fn test_ready_before_join_gets_error_message() {
    let addr = start_server(fast_lobby()).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, &ClientMessage::Ready).await;
    let msg = recv(&mut ws).await;
    assert!(matches!(msg, ServerMessage::Error { .. }), "got {msg:?}");
}

#[tokio::test]
async fn test_full_match_over_websocket() {
    let addr = start_server(fast_lobby()).await;
    let mut ann = connect(&addr).await;
    let mut bob = connect(&addr).await;
    join(&mut ann, "ann").await;
    let bob_id = join(&mut bob, "bob").await;

    send(&mut ann, &ClientMessage::Ready).await;
    send(&mut bob, &ClientMessage::Ready).await;

    let countdown = recv_until(&mut ann, |m| matches!(m, ServerMessage::Countdown { .. })).await;
    assert_eq!(countdown, ServerMessage::Countdown { seconds_remaining: 1 });

    let (_, ann_game) = sync_and_start(&mut ann).await;
    let (_, bob_game) = sync_and_start(&mut bob).await;
    assert_eq!(ann_game.len(), 4);
    assert!(bob_game.is_playing());

    send(
        &mut ann,
        &ClientMessage::Input {
            direction: Direction::Up,
            tick_count: 0,
            input_id: Some(1),
        },
    )
    .await;
    let acked = recv_until(&mut ann, |m| {
        matches!(m, ServerMessage::Tick { last_processed_input_id: Some(1), .. })
    })
    .await;
    let ServerMessage::Tick { player_state, .. } = acked else {
        unreachable!()
    };
    assert_eq!(player_state.direction(), Direction::Up);

    ann.send(Message::Close(None)).await.unwrap();
    let over = recv_until(&mut bob, |m| matches!(m, ServerMessage::GameOver { .. })).await;
    assert_eq!(over, ServerMessage::GameOver { winner: Some(bob_id) });
}

#[tokio::test]
async fn test_idle_connection_is_dropped() {
    let server = SnakenetServer::builder()
        .config(ServerConfig {
            bind: "127.0.0.1:0".into(),
            idle_timeout_secs: 1,
            ..ServerConfig::default()
        })
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    let lobby = server.lobby().clone();
    tokio::spawn(async move {
        let _ = server.run().await;
    });

    let mut ws = connect(&addr).await;
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) => return,
                Some(Ok(frame)) if frame.is_close() => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "server should close an idle connection");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(lobby.info().await.unwrap().connections, 0);
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let mut config = ServerConfig {
        bind: "127.0.0.1:0".into(),
        ..ServerConfig::default()
    };
    config.lobby.tick_rate_hz = 0;
    let result = SnakenetServer::builder().config(config).build().await;
    assert!(matches!(result, Err(SnakenetError::Config(_))));
}
