//! Client membership and clock synchronization for snakenet.
//!
//! This crate tracks who is connected and what they have told the lobby:
//!
//! 1. **Registry** — joined clients, their names and readiness
//!    ([`ClientRegistry`])
//! 2. **Time sync** — round-trip clock offset estimation with timeouts
//!    ([`TimeSync`], [`ClockSample`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby Layer (above)  ← decides when matches start and end
//!     ↕
//! Session Layer (this crate)  ← knows who each connection is
//!     ↕
//! Protocol Layer (below)  ← provides ClientId, ClientInfo
//! ```

mod clock;
mod error;
mod registry;
mod time_sync;

pub use clock::unix_time_ms;
pub use error::SessionError;
pub use registry::ClientRegistry;
pub use time_sync::{ClockSample, TimeSync};

/// Generates a random lowercase hex string of `2 * N` characters.
pub(crate) fn random_hex<const N: usize>() -> String {
    use rand::Rng;

    let bytes: [u8; N] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
