//! Room registry: the live graph of rooms and their member sockets.

use std::collections::HashSet;

use dashmap::DashMap;
use tracing::debug;

use crate::connection::handle::ConnectionId;

use super::membership::MembershipIndex;
use super::types::Room;

/// Registry of all non-empty rooms.
///
/// A room exists only while it has at least one member.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Room → member connections.
    rooms: DashMap<Room, HashSet<ConnectionId>>,
    /// Reverse index used on disconnect.
    memberships: MembershipIndex,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room. Returns `false` if it was already a member.
    pub fn join(&self, room: Room, conn_id: ConnectionId) -> bool {
        let inserted = self.rooms.entry(room).or_default().insert(conn_id);
        if inserted {
            self.memberships.add(conn_id, room);
            debug!(conn_id = %conn_id, room = %room, "Joined room");
        }
        inserted
    }

    /// Removes a connection from a room. Returns `false` if it was not a member.
    pub fn leave(&self, room: Room, conn_id: ConnectionId) -> bool {
        let removed = self.detach(&room, conn_id);
        if removed {
            self.memberships.remove(conn_id, &room);
            debug!(conn_id = %conn_id, room = %room, "Left room");
        }
        removed
    }

    /// Removes a connection from every room it joined.
    pub fn leave_all(&self, conn_id: ConnectionId) -> usize {
        let rooms = self.memberships.remove_all(conn_id);
        for room in &rooms {
            self.detach(room, conn_id);
        }
        rooms.len()
    }

    /// Returns the member connection IDs of a room.
    pub fn members(&self, room: &Room) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the member count of a room.
    pub fn member_count(&self, room: &Room) -> usize {
        self.rooms.get(room).map(|members| members.len()).unwrap_or(0)
    }

    /// Returns the rooms a connection has joined.
    pub fn rooms_of(&self, conn_id: ConnectionId) -> HashSet<Room> {
        self.memberships.rooms_of(conn_id)
    }

    /// Returns the number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn detach(&self, room: &Room, conn_id: ConnectionId) -> bool {
        let Some(mut members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&conn_id);
        if members.is_empty() {
            drop(members);
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }
        removed
    }
}
