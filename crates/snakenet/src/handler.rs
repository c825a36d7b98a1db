//! Per-connection handler: registers the connection with the lobby, then
//! pumps decoded messages in and encoded messages out.
//!
//! Each accepted connection gets its own task running
//! [`handle_connection`], plus a writer task draining the lobby's
//! outbound channel for it.

use std::sync::Arc;

use snakenet_lobby::LobbyHandle;
use snakenet_protocol::{ClientMessage, Codec, ServerMessage};
use snakenet_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::SnakenetError;
use crate::server::ServerState;

/// Tells the lobby the connection is gone when the handler exits, even
/// on panic. `Drop` is synchronous, so the notification is spawned.
struct LobbyGuard {
    conn_id: ConnectionId,
    lobby: LobbyHandle,
}

impl Drop for LobbyGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let lobby = self.lobby.clone();
        tokio::spawn(async move {
            let _ = lobby.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), SnakenetError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, "connection opened");

    let (tx, rx) = mpsc::unbounded_channel();
    state.lobby.connect(conn_id, tx).await?;
    let _guard = LobbyGuard {
        conn_id,
        lobby: state.lobby.clone(),
    };

    let writer = tokio::spawn(write_loop(Arc::clone(&conn), rx, Arc::clone(&state)));
    let result = read_loop(&conn, &state).await;

    writer.abort();
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after read loop");
    }
    tracing::info!(%conn_id, "connection closed");
    result
}

/// Decodes inbound frames and forwards them to the lobby until the peer
/// closes, errors, or stays silent past the idle timeout.
async fn read_loop<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
) -> Result<(), SnakenetError> {
    let conn_id = conn.id();
    loop {
        let received = match state.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, conn.recv()).await {
                Ok(r) => r,
                Err(_) => {
                    tracing::info!(%conn_id, "connection idle, dropping");
                    return Ok(());
                }
            },
            None => conn.recv().await,
        };

        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping malformed message");
                continue;
            }
        };
        tracing::trace!(%conn_id, kind = msg.kind(), "message received");
        state.lobby.send_message(conn_id, msg).await?;
    }
}

/// Encodes the lobby's messages for this connection and sends them.
/// Ends when the lobby drops the sender or the socket fails.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();
    while let Some(msg) = rx.recv().await {
        let bytes = match state.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, kind = msg.kind(), error = %e, "cannot encode message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, writer stopping");
            break;
        }
    }
}
