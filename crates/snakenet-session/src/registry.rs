//! The client registry: every joined connection and its lobby state.
//!
//! # Concurrency note
//!
//! `ClientRegistry` is a plain struct owned by the lobby actor. It is
//! never shared; all access goes through the actor's command channel.

use std::collections::HashMap;

use snakenet_protocol::{ClientId, ClientInfo};
use snakenet_transport::ConnectionId;

use crate::{SessionError, random_hex};

#[derive(Debug, Clone)]
struct Entry {
    conn: ConnectionId,
    name: String,
    ready: bool,
}

/// Joined clients, in join order, plus the order in which they readied.
///
/// ```text
/// join() ──→ [joined, not ready] ──mark_ready()──→ [ready]
///                   ↑                                 │
///                   └────────── reset_ready() ────────┘
/// remove_connection() drops a client from every set.
/// ```
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Entry>,
    by_conn: HashMap<ConnectionId, ClientId>,
    /// Join order; the roster is broadcast in this order.
    joined: Vec<ClientId>,
    /// Ready order; match slots are filled from the front.
    ready: Vec<ClientId>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `conn` under a fresh id with `ready = false`.
    ///
    /// The name is trimmed first.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyJoined`] if `conn` already joined
    /// - [`SessionError::InvalidName`] if the trimmed name is empty or
    ///   longer than `max_name_len` characters
    pub fn join(
        &mut self,
        conn: ConnectionId,
        name: &str,
        max_name_len: usize,
    ) -> Result<ClientInfo, SessionError> {
        if self.by_conn.contains_key(&conn) {
            return Err(SessionError::AlreadyJoined(conn));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidName("name is empty".into()));
        }
        if name.chars().count() > max_name_len {
            return Err(SessionError::InvalidName(format!(
                "name is longer than {max_name_len} characters"
            )));
        }

        let id = loop {
            let candidate = ClientId::new(random_hex::<8>());
            if !self.clients.contains_key(&candidate) {
                break candidate;
            }
        };

        self.clients.insert(
            id.clone(),
            Entry {
                conn,
                name: name.to_owned(),
                ready: false,
            },
        );
        self.by_conn.insert(conn, id.clone());
        self.joined.push(id.clone());

        tracing::info!(%conn, client_id = %id, name, "client joined");
        Ok(ClientInfo {
            id,
            name: name.to_owned(),
            ready: false,
        })
    }

    /// Marks a client ready. Returns `false` if it already was.
    ///
    /// # Errors
    /// [`SessionError::UnknownClient`] if no such client joined.
    pub fn mark_ready(&mut self, id: &ClientId) -> Result<bool, SessionError> {
        let entry = self
            .clients
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownClient(id.clone()))?;
        if entry.ready {
            return Ok(false);
        }
        entry.ready = true;
        self.ready.push(id.clone());
        tracing::debug!(client_id = %id, "client ready");
        Ok(true)
    }

    /// Clears every ready flag.
    pub fn reset_ready(&mut self) {
        for entry in self.clients.values_mut() {
            entry.ready = false;
        }
        self.ready.clear();
    }

    /// Drops the client behind `conn`, if it joined.
    pub fn remove_connection(&mut self, conn: ConnectionId) -> Option<ClientInfo> {
        let id = self.by_conn.remove(&conn)?;
        let entry = self.clients.remove(&id)?;
        self.joined.retain(|c| *c != id);
        self.ready.retain(|c| *c != id);
        tracing::info!(%conn, client_id = %id, "client left");
        Some(ClientInfo {
            id,
            name: entry.name,
            ready: entry.ready,
        })
    }

    /// The first `n` ready clients in the order they readied, or `None`
    /// if fewer than `n` are ready.
    pub fn first_ready(&self, n: usize) -> Option<Vec<ClientId>> {
        (self.ready.len() >= n).then(|| self.ready[..n].to_vec())
    }

    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    /// The client id behind a connection.
    pub fn client_for(&self, conn: ConnectionId) -> Option<&ClientId> {
        self.by_conn.get(&conn)
    }

    /// The connection a client is reachable on.
    pub fn connection_of(&self, id: &ClientId) -> Option<ConnectionId> {
        self.clients.get(id).map(|e| e.conn)
    }

    pub fn info(&self, id: &ClientId) -> Option<ClientInfo> {
        self.clients.get(id).map(|e| ClientInfo {
            id: id.clone(),
            name: e.name.clone(),
            ready: e.ready,
        })
    }

    pub fn is_ready(&self, id: &ClientId) -> bool {
        self.clients.get(id).is_some_and(|e| e.ready)
    }

    /// Every joined client in join order.
    pub fn roster(&self) -> Vec<ClientInfo> {
        self.joined.iter().filter_map(|id| self.info(id)).collect()
    }

    /// Connections of every joined client, in join order.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.joined
            .iter()
            .filter_map(|id| self.connection_of(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
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

    fn registry_with(names: &[&str]) -> (ClientRegistry, Vec<ClientId>) {
        let mut reg = ClientRegistry::new();
        let ids = names
            .iter()
            .enumerate()
            .map(|(i, n)| reg.join(conn(i as u64 + 1), n, 24).unwrap().id)
            .collect();
        (reg, ids)
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_assigns_unique_ids_and_not_ready() {
        let (reg, ids) = registry_with(&["ann", "bob"]);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(ids[0].as_str().len(), 16);
        assert!(!reg.is_ready(&ids[0]));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_join_trims_name() {
        let mut reg = ClientRegistry::new();
        let info = reg.join(conn(1), "  ann ", 24).unwrap();
        assert_eq!(info.name, "ann");
    }

    #[test]
    fn test_join_twice_on_same_connection_fails() {
        let mut reg = ClientRegistry::new();
        reg.join(conn(1), "ann", 24).unwrap();
        let err = reg.join(conn(1), "again", 24).unwrap_err();
        assert_eq!(err, SessionError::AlreadyJoined(conn(1)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_join_blank_name_fails() {
        let mut reg = ClientRegistry::new();
        assert!(matches!(
            reg.join(conn(1), "   ", 24),
            Err(SessionError::InvalidName(_))
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_join_long_name_fails() {
        let mut reg = ClientRegistry::new();
        assert!(reg.join(conn(1), "abcdef", 5).is_err());
        assert!(reg.join(conn(1), "abcde", 5).is_ok());
    }

    // =====================================================================
    // mark_ready() / first_ready()
    // =====================================================================

    #[test]
    fn test_mark_ready_unknown_client_fails() {
        let mut reg = ClientRegistry::new();
        let err = reg.mark_ready(&ClientId::new("ghost")).unwrap_err();
        assert!(matches!(err, SessionError::UnknownClient(_)));
    }

    #[test]
    fn test_mark_ready_twice_reports_no_change() {
        let (mut reg, ids) = registry_with(&["ann"]);
        assert!(reg.mark_ready(&ids[0]).unwrap());
        assert!(!reg.mark_ready(&ids[0]).unwrap());
        assert_eq!(reg.ready_count(), 1);
    }

    #[test]
    fn test_first_ready_uses_ready_order_not_join_order() {
        let (mut reg, ids) = registry_with(&["ann", "bob", "cat"]);
        reg.mark_ready(&ids[2]).unwrap();
        assert_eq!(reg.first_ready(2), None);
        reg.mark_ready(&ids[0]).unwrap();
        reg.mark_ready(&ids[1]).unwrap();
        assert_eq!(
            reg.first_ready(2),
            Some(vec![ids[2].clone(), ids[0].clone()])
        );
    }

    #[test]
    fn test_reset_ready_clears_all_flags() {
        let (mut reg, ids) = registry_with(&["ann", "bob"]);
        reg.mark_ready(&ids[0]).unwrap();
        reg.mark_ready(&ids[1]).unwrap();
        reg.reset_ready();
        assert_eq!(reg.ready_count(), 0);
        assert!(reg.roster().iter().all(|c| !c.ready));
    }

    // =====================================================================
    // remove_connection() / roster()
    // =====================================================================

    #[test]
    fn test_remove_connection_drops_from_every_set() {
        let (mut reg, ids) = registry_with(&["ann", "bob"]);
        reg.mark_ready(&ids[0]).unwrap();
        let removed = reg.remove_connection(conn(1)).unwrap();
        assert_eq!(removed.id, ids[0]);
        assert!(removed.ready);
        assert_eq!(reg.ready_count(), 0);
        assert_eq!(reg.client_for(conn(1)), None);
        assert_eq!(reg.roster().len(), 1);
    }

    #[test]
    fn test_remove_connection_never_joined_is_none() {
        let mut reg = ClientRegistry::new();
        assert!(reg.remove_connection(conn(9)).is_none());
    }

    #[test]
    fn test_roster_keeps_join_order() {
        let (reg, ids) = registry_with(&["ann", "bob", "cat"]);
        let roster: Vec<ClientId> = reg.roster().into_iter().map(|c| c.id).collect();
        assert_eq!(roster, ids);
        assert_eq!(reg.connections(), vec![conn(1), conn(2), conn(3)]);
    }
}
