//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level counters. All counters are monotonic.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    auth_failures: AtomicU64,
    frames_received: AtomicU64,
    frames_rejected: AtomicU64,
    messages_relayed: AtomicU64,
    messages_dropped: AtomicU64,
    stats_pushed: AtomicU64,
    stats_failures: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// A socket passed authentication and was registered.
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// A registered socket was torn down.
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// A handshake was rejected.
    pub fn auth_failed(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// An inbound frame arrived.
    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// An inbound frame was oversized or malformed.
    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A bus message was routed to its room.
    pub fn message_relayed(&self) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// A bus message was discarded.
    pub fn message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// A statistics snapshot was emitted.
    pub fn stats_pushed(&self) {
        self.stats_pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// A statistics computation failed.
    pub fn stats_failed(&self) {
        self.stats_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            stats_pushed: self.stats_pushed.load(Ordering::Relaxed),
            stats_failures: self.stats_failures.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Sockets registered since start.
    pub connections_opened: u64,
    /// Sockets torn down since start.
    pub connections_closed: u64,
    /// Rejected handshakes.
    pub auth_failures: u64,
    /// Inbound frames.
    pub frames_received: u64,
    /// Oversized or malformed inbound frames.
    pub frames_rejected: u64,
    /// Bus messages fanned out to sockets.
    pub messages_relayed: u64,
    /// Bus messages discarded (raw, untargeted, or unknown channel).
    pub messages_dropped: u64,
    /// Statistics snapshots emitted.
    pub stats_pushed: u64,
    /// Failed statistics computations.
    pub stats_failures: u64,
}

impl MetricsSnapshot {
    /// Sockets currently registered.
    pub fn connections_active(&self) -> u64 {
        self.connections_opened
            .saturating_sub(self.connections_closed)
    }
}
