//! Error types for the lobby layer.

use snakenet_session::SessionError;
use snakenet_sim::SimError;
use snakenet_transport::ConnectionId;

use crate::LobbyStatus;

/// Errors that can occur during lobby operations.
///
/// Anything caused by a client's request is reported back to that client
/// as an `error` message; none of these end the connection.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The connection has not sent `join` yet.
    #[error("{0} has not joined")]
    NotJoined(ConnectionId),

    /// The lobby is in a state that doesn't allow this request.
    #[error("not accepting this request while {0}")]
    NotAccepting(LobbyStatus),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// A match could not be built from the configured game settings.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// The lobby actor's command channel is closed.
    #[error("lobby is unavailable")]
    Unavailable,
}
