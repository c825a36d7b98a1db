//! Wire packets exchanged by the sync layer.

use serde::{Deserialize, Serialize};

/// One client input, client → server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPacket<I> {
    /// The tick the client applied this input at.
    pub tick: u64,
    /// Strictly increasing per client. Used to dedupe and acknowledge.
    pub input_id: u64,
    pub payload: I,
}

/// The authoritative state after a tick, server → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePacket<S> {
    /// The server tick this state belongs to.
    pub tick: u64,
    /// Highest input id folded into `state`, if any.
    pub last_processed_input_id: Option<u64>,
    pub state: S,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_packet_wire_names() {
        let packet = InputPacket {
            tick: 4,
            input_id: 9,
            payload: "UP",
        };
        let json = serde_json::to_value(&packet).unwrap();
        assert_eq!(json["tick"], 4);
        assert_eq!(json["inputId"], 9);
        assert_eq!(json["payload"], "UP");
    }

    #[test]
    fn test_state_packet_without_ack_is_null() {
        let packet = StatePacket {
            tick: 1,
            last_processed_input_id: None,
            state: 0u8,
        };
        let json = serde_json::to_value(&packet).unwrap();
        assert!(json["lastProcessedInputId"].is_null());
    }
}
