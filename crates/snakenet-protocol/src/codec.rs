//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The rest of the server never touches `serde_json` directly; it goes
//! through a [`Codec`], so a binary format can replace JSON without
//! touching the lobby or the connection handler.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// `ProtocolError::Decode` if the bytes are malformed, incomplete, or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON, the format browser clients speak.
///
/// ```rust
/// use snakenet_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage = codec.decode(br#"{"type":"ready"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::Ready);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientId, ServerMessage};

    #[test]
    fn test_json_codec_encodes_server_message() {
        let bytes = JsonCodec
            .encode(&ServerMessage::GameOver {
                winner: Some(ClientId::new("c1")),
            })
            .unwrap();
        assert_eq!(bytes, br#"{"type":"game_over","winner":"c1"}"#);
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let err = JsonCodec
            .decode::<ServerMessage>(b"not json")
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(err.to_string().starts_with("decode failed"));
    }
}
