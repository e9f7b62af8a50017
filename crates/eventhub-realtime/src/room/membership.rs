//! Membership tracking: which rooms each connection has joined.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::connection::handle::ConnectionId;

use super::types::Room;

/// Connection-to-room reverse index.
#[derive(Debug, Default)]
pub struct MembershipIndex {
    /// Connection ID → set of joined rooms.
    conn_to_rooms: DashMap<ConnectionId, HashSet<Room>>,
}

impl MembershipIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a membership.
    pub fn add(&self, conn_id: ConnectionId, room: Room) {
        self.conn_to_rooms.entry(conn_id).or_default().insert(room);
    }

    /// Removes a membership.
    pub fn remove(&self, conn_id: ConnectionId, room: &Room) {
        if let Some(mut rooms) = self.conn_to_rooms.get_mut(&conn_id) {
            rooms.remove(room);
            if rooms.is_empty() {
                drop(rooms);
                self.conn_to_rooms
                    .remove_if(&conn_id, |_, rooms| rooms.is_empty());
            }
        }
    }

    /// Gets all rooms a connection has joined.
    pub fn rooms_of(&self, conn_id: ConnectionId) -> HashSet<Room> {
        self.conn_to_rooms
            .get(&conn_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Removes all memberships for a connection.
    pub fn remove_all(&self, conn_id: ConnectionId) -> HashSet<Room> {
        self.conn_to_rooms
            .remove(&conn_id)
            .map(|(_, rooms)| rooms)
            .unwrap_or_default()
    }
}
