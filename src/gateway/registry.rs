use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque handle for one live WebSocket, generated at upgrade time.
pub type ConnectionId = Uuid;

/// Bounded per-connection outbound queue. A full queue drops the newest
/// frame rather than blocking the writer.
pub const OUTBOUND_QUEUE: usize = 64;

pub struct RegistryEntry {
    pub user_id: String,
    pub tx: mpsc::Sender<String>,
    pub connected_at: DateTime<Utc>,
}

/// Maps connection IDs to authenticated users and their outbound senders.
/// A user may hold several connections at once (multiple devices/tabs); a
/// connection ID never appears twice.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, RegistryEntry>,
    by_user: DashMap<String, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the connection's user binding and outbound sender. Re-binding
    /// the same connection overwrites and repairs the user index.
    pub fn bind(&self, conn_id: ConnectionId, user_id: &str, tx: mpsc::Sender<String>) {
        let entry = RegistryEntry {
            user_id: user_id.to_string(),
            tx,
            connected_at: Utc::now(),
        };
        if let Some(previous) = self.connections.insert(conn_id, entry) {
            if previous.user_id != user_id {
                self.drop_from_user_index(&previous.user_id, conn_id);
            }
        }
        self.by_user
            .entry(user_id.to_string())
            .or_default()
            .insert(conn_id);
    }

    /// Removes the binding if present. Idempotent; teardown paths may race.
    pub fn unbind(&self, conn_id: ConnectionId) -> Option<RegistryEntry> {
        let (_, entry) = self.connections.remove(&conn_id)?;
        self.drop_from_user_index(&entry.user_id, conn_id);
        Some(entry)
    }

    fn drop_from_user_index(&self, user_id: &str, conn_id: ConnectionId) {
        if let Some(mut conns) = self.by_user.get_mut(user_id) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                drop(conns);
                self.by_user
                    .remove_if(user_id, |_, conns| conns.is_empty());
            }
        }
    }

    pub fn connections_for(&self, user_id: &str) -> Vec<ConnectionId> {
        self.by_user
            .get(user_id)
            .map(|conns| conns.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn user_of(&self, conn_id: ConnectionId) -> Option<String> {
        self.connections.get(&conn_id).map(|e| e.user_id.clone())
    }

    pub fn sender_of(&self, conn_id: ConnectionId) -> Option<mpsc::Sender<String>> {
        self.connections.get(&conn_id).map(|e| e.tx.clone())
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Visits every bound connection's sender. Used for broadcast paths.
    pub fn for_each_sender(&self, mut f: impl FnMut(ConnectionId, &mpsc::Sender<String>)) {
        for entry in self.connections.iter() {
            f(*entry.key(), &entry.tx);
        }
    }
}
