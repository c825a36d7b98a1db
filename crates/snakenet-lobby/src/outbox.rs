//! Where the lobby's outbound messages go.

use std::collections::HashMap;

use snakenet_protocol::ServerMessage;
use snakenet_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel sender for delivering outbound messages to one connection.
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// Sink for messages addressed to a connection.
///
/// The lobby never blocks on delivery; an implementation drops messages
/// for connections it no longer knows.
pub trait Outbox {
    fn send(&mut self, conn: ConnectionId, msg: ServerMessage);
}

/// Collects messages in order. Handy for driving a lobby by hand.
impl Outbox for Vec<(ConnectionId, ServerMessage)> {
    fn send(&mut self, conn: ConnectionId, msg: ServerMessage) {
        self.push((conn, msg));
    }
}

/// Per-connection unbounded channels, as used by the lobby actor.
#[derive(Debug, Default)]
pub struct ChannelOutbox {
    senders: HashMap<ConnectionId, ClientSender>,
}

impl ChannelOutbox {
    pub fn register(&mut self, conn: ConnectionId, sender: ClientSender) {
        self.senders.insert(conn, sender);
    }

    pub fn unregister(&mut self, conn: ConnectionId) {
        self.senders.remove(&conn);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

impl Outbox for ChannelOutbox {
    fn send(&mut self, conn: ConnectionId, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&conn) {
            // Receiver gone means the connection task is shutting down.
            let _ = sender.send(msg);
        }
    }
}
