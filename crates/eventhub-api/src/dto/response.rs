//! Response DTOs.

use serde::{Deserialize, Serialize};

use eventhub_realtime::metrics::MetricsSnapshot;

/// Standard API success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
}

/// Gateway state for operators.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    /// Overall status.
    pub status: String,
    /// Bus backend name.
    pub bus: String,
    /// Open sockets.
    pub ws_connections: usize,
    /// Distinct online users.
    pub online_users: usize,
    /// Rooms with at least one member.
    pub rooms: usize,
    /// Engine counters.
    pub metrics: MetricsSnapshot,
}
