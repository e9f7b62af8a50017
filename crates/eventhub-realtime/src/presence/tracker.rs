//! Presence tracker: which users are online, counted per user not per socket.

use std::collections::HashSet;

use dashmap::DashMap;
use tracing::debug;

use eventhub_core::types::UserId;

use crate::connection::handle::ConnectionId;

/// Tracks online users by the sockets they hold open.
///
/// A user is online while at least one of their sockets is registered.
/// Every operation is keyed by socket id, so concurrent add/remove calls
/// from several tabs of the same user never lose an update.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    /// Socket → owning user.
    socket_to_user: DashMap<ConnectionId, UserId>,
    /// User → open sockets. An entry never holds an empty set.
    user_sockets: DashMap<UserId, HashSet<ConnectionId>>,
}

impl PresenceTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a socket for a user. Returns the online count afterwards.
    ///
    /// The count grows only when this is the user's first socket.
    pub fn add_user(&self, conn_id: ConnectionId, user_id: UserId) -> usize {
        if let Some(previous) = self.socket_to_user.insert(conn_id, user_id) {
            if previous != user_id {
                self.detach(conn_id, previous);
            }
        }
        self.user_sockets.entry(user_id).or_default().insert(conn_id);

        let online = self.online_count();
        debug!(conn_id = %conn_id, user_id = %user_id, online, "Presence added");
        online
    }

    /// Forget a socket. Returns the online count afterwards.
    ///
    /// Unknown sockets are ignored, so calling this twice is harmless.
    pub fn remove_user(&self, conn_id: ConnectionId) -> usize {
        if let Some((_, user_id)) = self.socket_to_user.remove(&conn_id) {
            self.detach(conn_id, user_id);
            debug!(conn_id = %conn_id, user_id = %user_id, "Presence removed");
        }
        self.online_count()
    }

    /// Number of distinct online users.
    pub fn online_count(&self) -> usize {
        self.user_sockets.len()
    }

    /// Check if a user has any open socket
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.user_sockets.contains_key(&user_id)
    }

    /// Number of sockets a user holds open.
    pub fn socket_count(&self, user_id: UserId) -> usize {
        self.user_sockets
            .get(&user_id)
            .map(|sockets| sockets.len())
            .unwrap_or(0)
    }

    /// The user owning a socket, if registered.
    pub fn user_of(&self, conn_id: ConnectionId) -> Option<UserId> {
        self.socket_to_user.get(&conn_id).map(|entry| *entry.value())
    }

    fn detach(&self, conn_id: ConnectionId, user_id: UserId) {
        if let Some(mut sockets) = self.user_sockets.get_mut(&user_id) {
            sockets.remove(&conn_id);
            if sockets.is_empty() {
                drop(sockets);
                self.user_sockets
                    .remove_if(&user_id, |_, sockets| sockets.is_empty());
            }
        }
    }
}
