//! Connection manager: connection lifecycle and frame delivery to rooms.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use eventhub_core::config::RealtimeConfig;

use crate::message::types::ServerEvent;
use crate::metrics::RealtimeMetrics;
use crate::presence::tracker::PresenceTracker;
use crate::room::{Room, RoomRegistry};

use super::authenticator::AuthenticatedConnection;
use super::handle::{ConnectionHandle, ConnectionId};
use super::pool::ConnectionPool;

/// Manages all registered sockets along with their presence and rooms.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: ConnectionPool,
    /// Room registry.
    rooms: Arc<RoomRegistry>,
    /// Presence tracker.
    presence: Arc<PresenceTracker>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Outbound buffer per connection.
    buffer_size: usize,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: &RealtimeConfig,
        rooms: Arc<RoomRegistry>,
        presence: Arc<PresenceTracker>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            pool: ConnectionPool::new(),
            rooms,
            presence,
            metrics,
            buffer_size: config.channel_buffer_size.max(1),
        }
    }

    /// Registers an authenticated socket.
    ///
    /// Joins the user and role rooms, records presence, and pushes the new
    /// online count to admins. Returns the handle and a receiver for
    /// outbound frames.
    pub fn register(
        &self,
        auth: AuthenticatedConnection,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let handle = Arc::new(ConnectionHandle::new(
            auth.user_id,
            auth.role,
            auth.name,
            tx,
        ));

        self.pool.add(handle.clone());
        for room in Room::defaults_for(handle.user_id, handle.role) {
            self.rooms.join(room, handle.id);
        }
        let online = self.presence.add_user(handle.id, handle.user_id);
        self.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            user_id = %handle.user_id,
            role = %handle.role,
            online,
            "Socket registered"
        );

        self.push_online_count(online);
        (handle, rx)
    }

    /// Tears down a socket: leaves every room, drops presence, pushes the
    /// new online count to admins, then cancels its ticker.
    ///
    /// Presence is released before the ticker is awaited, so a stalled
    /// statistics query cannot keep a closed socket online.
    ///
    /// Returns `false` if the socket was not registered.
    pub async fn unregister(&self, conn_id: &ConnectionId) -> bool {
        let Some(handle) = self.pool.remove(conn_id) else {
            return false;
        };

        handle.mark_closed();
        let rooms_left = self.rooms.leave_all(*conn_id);
        let online = self.presence.remove_user(*conn_id);
        self.metrics.connection_closed();

        info!(
            conn_id = %conn_id,
            user_id = %handle.user_id,
            rooms_left,
            online,
            session_secs = (Utc::now() - handle.connected_at).num_seconds(),
            "Socket unregistered"
        );

        self.push_online_count(online);
        handle.close().await;
        true
    }

    /// Closes every registered socket.
    pub async fn close_all(&self) {
        let all = self.pool.all_connections();
        for conn in &all {
            self.unregister(&conn.id).await;
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Adds a registered socket to a room.
    pub fn join_room(&self, conn_id: ConnectionId, room: Room) -> bool {
        if self.pool.get(&conn_id).is_none() {
            return false;
        }
        self.rooms.join(room, conn_id)
    }

    /// Removes a socket from a room.
    pub fn leave_room(&self, conn_id: ConnectionId, room: Room) -> bool {
        self.rooms.leave(room, conn_id)
    }

    /// Queues a frame for every member of a room. Returns the number of
    /// sockets that accepted it.
    pub fn emit_to_room(&self, room: &Room, frame: &str) -> usize {
        let sent = self
            .rooms
            .members(room)
            .iter()
            .filter_map(|conn_id| self.pool.get(conn_id))
            .filter(|handle| handle.send(frame.to_string()))
            .count();
        debug!(room = %room, sent, "Emitted to room");
        sent
    }

    /// Encodes and emits a gateway event to a room.
    pub fn emit_event_to_room(&self, room: &Room, event: &ServerEvent) -> usize {
        match event.to_frame() {
            Some(frame) => self.emit_to_room(room, &frame),
            None => 0,
        }
    }

    /// Queues a frame for every registered socket.
    pub fn emit_to_all(&self, frame: &str) -> usize {
        self.pool
            .all_connections()
            .iter()
            .filter(|handle| handle.send(frame.to_string()))
            .count()
    }

    /// Pushes `dashboard_online_update` to admins.
    fn push_online_count(&self, online_users: usize) {
        self.emit_event_to_room(&Room::ADMINS, &ServerEvent::DashboardOnlineUpdate { online_users });
    }

    /// Gets a registered socket.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(conn_id)
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of distinct online users.
    pub fn online_count(&self) -> usize {
        self.presence.online_count()
    }

    /// Returns the member count of a room.
    pub fn room_size(&self, room: &Room) -> usize {
        self.rooms.member_count(room)
    }

    /// Returns the room registry.
    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    /// Returns the presence tracker.
    pub fn presence(&self) -> &Arc<PresenceTracker> {
        &self.presence
    }
}
