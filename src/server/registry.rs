//! Open connections, owned by the listener and keyed by [`ConnectionId`].

use std::collections::HashMap;
use std::time::Instant;

use crate::http::connection::{Connection, ConnectionId};

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    next_id: u64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the id for a connection about to be accepted.
    pub fn next_id(&mut self) -> ConnectionId {
        self.next_id += 1;
        ConnectionId(self.next_id)
    }

    pub fn insert(&mut self, conn: Connection) {
        self.connections.insert(conn.id, conn);
    }

    /// Removes a connection so it can be served without borrowing the registry.
    pub fn take(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ConnectionId, &mut Connection)> {
        self.connections.iter_mut().map(|(id, conn)| (*id, conn))
    }

    /// Removes and returns every connection whose idle deadline has passed.
    pub fn reap_idle(&mut self, now: Instant) -> Vec<Connection> {
        let expired: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.is_idle(now))
            .map(|(id, _)| *id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.connections.remove(&id))
            .collect()
    }
}
