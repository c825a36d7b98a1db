//! Wire protocol for snakenet.
//!
//! Every message is one JSON object discriminated by a `type` string:
//!
//! ```text
//! {"type":"join","name":"ann"}
//! {"type":"input","direction":"UP","tickCount":12,"inputId":3}
//! {"type":"countdown","secondsRemaining":2}
//! ```
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`ClientInfo`],
//!   [`ClientId`]) — what travels on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   turned into bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Lobby
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientId, ClientInfo, ClientMessage, ServerMessage};
