//! Individual socket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use eventhub_core::types::{UserId, UserRole};

use crate::message::types::ServerEvent;
use crate::stats::task::StatsTask;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A handle to a single authenticated socket.
///
/// Holds the sender for pushing frames to the client, the identity taken
/// from the access token, and the optional per-socket statistics ticker.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// User's role (cached for quick checks)
    pub role: UserRole,
    /// Display name from the token
    pub name: String,
    /// Sender for outbound frames
    sender: mpsc::Sender<String>,
    /// Organizer statistics ticker, at most one per socket
    stats_task: Mutex<Option<StatsTask>>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Whether the connection is still alive
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(user_id: UserId, role: UserRole, name: String, sender: mpsc::Sender<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role,
            name,
            sender,
            stats_task: Mutex::new(None),
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
        }
    }

    /// Queue a text frame for this connection
    pub fn send(&self, frame: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, "Send buffer full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                false
            }
        }
    }

    /// Encode and queue a gateway event
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        event.to_frame().is_some_and(|frame| self.send(frame))
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as closed. Returns `true` on the first call only.
    pub fn mark_closed(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }

    /// Install the statistics ticker unless one is running or the socket is closed.
    ///
    /// `spawn` is only invoked when the slot is free.
    pub async fn start_stats_task(&self, spawn: impl FnOnce() -> StatsTask) -> bool {
        let mut slot = self.stats_task.lock().await;
        if !self.is_alive() || slot.is_some() {
            return false;
        }
        *slot = Some(spawn());
        debug!(conn_id = %self.id, "Stats ticker started");
        true
    }

    /// Whether a statistics ticker is installed.
    pub async fn has_stats_task(&self) -> bool {
        self.stats_task.lock().await.is_some()
    }

    /// Close the connection and cancel its ticker.
    ///
    /// The ticker is taken out of its slot, so it is cancelled exactly once
    /// however many times this is called.
    pub async fn close(&self) {
        self.mark_closed();
        let task = self.stats_task.lock().await.take();
        if let Some(task) = task {
            task.cancel().await;
            debug!(conn_id = %self.id, "Stats ticker cancelled");
        }
    }
}
