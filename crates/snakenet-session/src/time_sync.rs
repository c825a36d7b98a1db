//! Round-trip clock synchronization.
//!
//! ```text
//! server                                client
//!   │ t0 ── time_sync_request{id} ───────→ │
//!   │ ←── time_sync_response{id, remote} ─ │
//!   │ now
//!
//! rtt     = now - t0
//! latency = rtt / 2
//! offset  = remote - now + latency      (client clock - server clock)
//! ```
//!
//! Requests carry a deadline. The owner calls [`TimeSync::expire`]
//! periodically; a request that missed its deadline is removed and
//! reported, never left registered.

use std::collections::HashMap;

use snakenet_transport::ConnectionId;

use crate::{SessionError, random_hex};

/// One completed measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    pub rtt_ms: u64,
    pub latency_ms: u64,
    /// Add to a local timestamp to get the peer's clock.
    pub offset_ms: i64,
}

impl ClockSample {
    /// A sample that changes nothing, used when a peer never answered.
    pub const ZERO: ClockSample = ClockSample {
        rtt_ms: 0,
        latency_ms: 0,
        offset_ms: 0,
    };

    /// Translates a local timestamp to the peer's clock.
    pub fn to_remote(&self, local_ms: u64) -> u64 {
        local_ms.saturating_add_signed(self.offset_ms)
    }
}

#[derive(Debug, Clone)]
struct Pending {
    conn: ConnectionId,
    sent_at_ms: u64,
    deadline_ms: u64,
}

/// Outstanding time-sync requests.
#[derive(Debug)]
pub struct TimeSync {
    pending: HashMap<String, Pending>,
    timeout_ms: u64,
}

impl TimeSync {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            timeout_ms,
        }
    }

    /// Registers a request to `conn` sent at `now_ms` and returns its id.
    pub fn begin(&mut self, conn: ConnectionId, now_ms: u64) -> String {
        let request_id = loop {
            let candidate = random_hex::<8>();
            if !self.pending.contains_key(&candidate) {
                break candidate;
            }
        };
        self.pending.insert(
            request_id.clone(),
            Pending {
                conn,
                sent_at_ms: now_ms,
                deadline_ms: now_ms.saturating_add(self.timeout_ms),
            },
        );
        tracing::debug!(%conn, %request_id, "time sync requested");
        request_id
    }

    /// Resolves a request with the peer's timestamp.
    ///
    /// # Errors
    /// [`SessionError::UnknownSyncRequest`] if `request_id` is not pending
    /// for `conn` (unknown, already resolved, expired, or sent by a
    /// different connection).
    pub fn complete(
        &mut self,
        conn: ConnectionId,
        request_id: &str,
        remote_ms: u64,
        now_ms: u64,
    ) -> Result<ClockSample, SessionError> {
        match self.pending.get(request_id) {
            Some(p) if p.conn == conn => {}
            _ => return Err(SessionError::UnknownSyncRequest(request_id.to_owned())),
        }
        let pending = self
            .pending
            .remove(request_id)
            .ok_or_else(|| SessionError::UnknownSyncRequest(request_id.to_owned()))?;

        let rtt_ms = now_ms.saturating_sub(pending.sent_at_ms);
        let latency_ms = rtt_ms / 2;
        let offset_ms = remote_ms as i64 - now_ms as i64 + latency_ms as i64;
        let sample = ClockSample {
            rtt_ms,
            latency_ms,
            offset_ms,
        };
        tracing::debug!(%conn, request_id, rtt_ms, offset_ms, "time sync sample");
        Ok(sample)
    }

    /// Removes every request whose deadline has passed and returns them.
    pub fn expire(&mut self, now_ms: u64) -> Vec<(String, ConnectionId)> {
        let expired: Vec<(String, ConnectionId)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline_ms <= now_ms)
            .map(|(id, p)| (id.clone(), p.conn))
            .collect();
        for (id, conn) in &expired {
            self.pending.remove(id);
            tracing::warn!(%conn, request_id = %id, "time sync timed out");
        }
        expired
    }

    /// Drops every request to `conn`, e.g. because it closed. Returns the
    /// ids that were failed.
    pub fn fail_all_for(&mut self, conn: ConnectionId) -> Vec<String> {
        let failed: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| p.conn == conn)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &failed {
            self.pending.remove(id);
        }
        failed
    }

    /// Drops every outstanding request.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }

    /// The earliest deadline among outstanding requests.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.pending.values().map(|p| p.deadline_ms).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn test_complete_computes_rtt_latency_and_offset() {
        let mut sync = TimeSync::new(2_000);
        let id = sync.begin(conn(1), 1_000);
        // Client clock is 5s ahead; 100ms round trip.
        let sample = sync.complete(conn(1), &id, 6_050, 1_100).unwrap();
        assert_eq!(sample.rtt_ms, 100);
        assert_eq!(sample.latency_ms, 50);
        assert_eq!(sample.offset_ms, 5_000);
        assert_eq!(sample.to_remote(2_000), 7_000);
        assert!(sync.is_empty());
    }

    #[test]
    fn test_complete_negative_offset_when_peer_is_behind() {
        let mut sync = TimeSync::new(2_000);
        let id = sync.begin(conn(1), 10_000);
        let sample = sync.complete(conn(1), &id, 7_020, 10_040).unwrap();
        assert_eq!(sample.offset_ms, -3_000);
        assert_eq!(sample.to_remote(10_000), 7_000);
    }

    #[test]
    fn test_complete_twice_fails() {
        let mut sync = TimeSync::new(2_000);
        let id = sync.begin(conn(1), 0);
        sync.complete(conn(1), &id, 0, 10).unwrap();
        let err = sync.complete(conn(1), &id, 0, 20).unwrap_err();
        assert_eq!(err, SessionError::UnknownSyncRequest(id));
    }

    #[test]
    fn test_complete_from_other_connection_fails_and_keeps_request() {
        let mut sync = TimeSync::new(2_000);
        let id = sync.begin(conn(1), 0);
        assert!(sync.complete(conn(2), &id, 0, 10).is_err());
        assert!(sync.is_pending(&id));
    }

    #[test]
    fn test_expire_removes_only_overdue_requests() {
        let mut sync = TimeSync::new(2_000);
        let old = sync.begin(conn(1), 0);
        let fresh = sync.begin(conn(2), 1_500);
        assert_eq!(sync.next_deadline_ms(), Some(2_000));

        assert!(sync.expire(1_999).is_empty());
        let expired = sync.expire(2_000);
        assert_eq!(expired, vec![(old.clone(), conn(1))]);
        assert!(!sync.is_pending(&old));
        assert!(sync.is_pending(&fresh));
        assert!(sync.complete(conn(1), &old, 0, 2_100).is_err());
    }

    #[test]
    fn test_fail_all_for_drops_only_that_connection() {
        let mut sync = TimeSync::new(2_000);
        let a = sync.begin(conn(1), 0);
        let b = sync.begin(conn(2), 0);
        assert_eq!(sync.fail_all_for(conn(1)), vec![a]);
        assert_eq!(sync.len(), 1);
        assert!(sync.is_pending(&b));
    }
}
