//! Error types for the simulation.

/// Errors that can occur when building a game.
///
/// Gameplay itself never errors: disallowed directions are dropped and a
/// collision is a [`TickOutcome`](crate::TickOutcome), not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// The grid size or initial snake length cannot produce a valid game.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
