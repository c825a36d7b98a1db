//! Error types for the session layer.

use snakenet_protocol::ClientId;
use snakenet_transport::ConnectionId;

/// Errors that can occur during membership and time-sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No joined client has this id.
    #[error("unknown client {0}")]
    UnknownClient(ClientId),

    /// The connection already joined; a name is chosen once.
    #[error("{0} has already joined")]
    AlreadyJoined(ConnectionId),

    /// The requested display name is empty or too long.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A time-sync response did not match any outstanding request from
    /// that connection. It may have timed out already.
    #[error("no pending time sync request {0}")]
    UnknownSyncRequest(String),
}
