//! Error types for the sync layer.

/// Errors from [`PredictionClient`](crate::PredictionClient).
///
/// The server side never errors: late inputs are rescheduled and
/// duplicates are dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Too many inputs are waiting for acknowledgement. The server has
    /// likely stopped answering.
    #[error("{pending} inputs awaiting acknowledgement (limit {limit})")]
    Backlogged { pending: usize, limit: usize },
}
