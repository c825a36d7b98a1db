//! Unified error type for snakenet.

use snakenet_lobby::LobbyError;
use snakenet_protocol::ProtocolError;
use snakenet_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps the layer errors a server can hit.
///
/// The `#[from]` conversions let `?` lift sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum SnakenetError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The lobby refused a request or is gone.
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The server configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let err: SnakenetError = err.into();
        assert!(matches!(err, SnakenetError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let err: SnakenetError = err.into();
        assert!(matches!(err, SnakenetError::Protocol(_)));
    }

    #[test]
    fn test_from_lobby_error() {
        let err: SnakenetError = LobbyError::Unavailable.into();
        assert!(matches!(err, SnakenetError::Lobby(_)));
        assert_eq!(err.to_string(), "lobby is unavailable");
    }

    #[test]
    fn test_from_config_error() {
        let err: SnakenetError = ConfigError::Invalid("bind is empty".into()).into();
        assert!(matches!(err, SnakenetError::Config(_)));
    }
}
