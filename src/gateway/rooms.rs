use dashmap::DashMap;
use std::collections::HashSet;

use super::registry::ConnectionId;

/// Deterministic name of a user's implicit room, auto-joined on
/// authentication. The prefix keeps client-supplied conversation IDs from
/// colliding with per-user rooms.
pub fn user_room(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Deterministic name of an ad hoc conversation room.
pub fn conversation_room(conversation_id: &str) -> String {
    format!("conversation:{conversation_id}")
}

/// Room membership, decoupling "who should receive this" from how a
/// connection is identified. Rooms are created lazily on first join and
/// discarded when the last member leaves. The reverse index lets
/// `leave_all` run without scanning every room.
#[derive(Default)]
pub struct RoomIndex {
    rooms: DashMap<String, HashSet<ConnectionId>>,
    memberships: DashMap<ConnectionId, HashSet<String>>,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, room: &str, conn_id: ConnectionId) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn_id);
        self.memberships
            .entry(conn_id)
            .or_default()
            .insert(room.to_string());
    }

    pub fn leave(&self, room: &str, conn_id: ConnectionId) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(&conn_id);
            if members.is_empty() {
                drop(members);
                self.rooms.remove_if(room, |_, members| members.is_empty());
            }
        }
        if let Some(mut rooms) = self.memberships.get_mut(&conn_id) {
            rooms.remove(room);
            if rooms.is_empty() {
                drop(rooms);
                self.memberships
                    .remove_if(&conn_id, |_, rooms| rooms.is_empty());
            }
        }
    }

    /// Removes the connection from every room it belongs to. Called on
    /// disconnect; idempotent.
    pub fn leave_all(&self, conn_id: ConnectionId) {
        let Some((_, rooms)) = self.memberships.remove(&conn_id) else {
            return;
        };
        for room in rooms {
            if let Some(mut members) = self.rooms.get_mut(&room) {
                members.remove(&conn_id);
                if members.is_empty() {
                    drop(members);
                    self.rooms.remove_if(&room, |_, members| members.is_empty());
                }
            }
        }
    }

    pub fn members_of(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
