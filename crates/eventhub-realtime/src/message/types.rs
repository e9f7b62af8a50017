//! Client-to-gateway and gateway-to-client event definitions.
//!
//! Every frame on the wire is a JSON text frame `{"event": <name>, "data": <payload>}`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use eventhub_core::error::AppError;
use eventhub_core::types::{AdminStats, EventId, OrganizerStats, StatsSnapshot};

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Follow an event's room.
    JoinEventRoom(EventId),
    /// Stop following an event's room.
    LeaveEventRoom(EventId),
    /// Compute platform statistics now.
    RequestAdminStats,
    /// Compute the caller's organizer statistics now and keep them coming.
    RequestOrganizerStats,
    /// Liveness probe.
    Ping,
}

/// Raw frame shape before the event name is resolved.
#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ClientEvent {
    /// Parse a text frame into a known client event.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let frame: RawFrame = serde_json::from_str(raw)
            .map_err(|e| AppError::validation(format!("Malformed frame: {e}")))?;

        match frame.event.as_str() {
            "join_event_room" => event_id_from(&frame.data).map(Self::JoinEventRoom),
            "leave_event_room" => event_id_from(&frame.data).map(Self::LeaveEventRoom),
            "request_admin_stats" => Ok(Self::RequestAdminStats),
            "request_organizer_stats" => Ok(Self::RequestOrganizerStats),
            "ping" => Ok(Self::Ping),
            other => Err(AppError::validation(format!("Unknown event: '{other}'"))),
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinEventRoom(_) => "join_event_room",
            Self::LeaveEventRoom(_) => "leave_event_room",
            Self::RequestAdminStats => "request_admin_stats",
            Self::RequestOrganizerStats => "request_organizer_stats",
            Self::Ping => "ping",
        }
    }
}

/// Accepts `7`, `"7"` or `{"eventId": 7}`.
fn event_id_from(data: &Value) -> Result<EventId, AppError> {
    let id = match data {
        Value::Number(n) => n.as_i64().map(EventId::new),
        Value::String(s) => s.parse().ok(),
        Value::Object(map) => {
            return map
                .get("eventId")
                .ok_or_else(|| AppError::validation("Missing eventId"))
                .and_then(event_id_from);
        }
        _ => None,
    };
    id.ok_or_else(|| AppError::validation("Invalid eventId"))
}

/// Events the gateway emits itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Reply to `ping`.
    Pong {
        /// Server time in milliseconds since the Unix epoch.
        timestamp: i64,
    },
    /// Platform statistics.
    DashboardStatsUpdate(StatsSnapshot<AdminStats>),
    /// Number of distinct online users.
    DashboardOnlineUpdate {
        /// Distinct users with at least one open socket.
        #[serde(rename = "onlineUsers")]
        online_users: usize,
    },
    /// Statistics scoped to the requesting organizer.
    OrganizerStatsUpdate(StatsSnapshot<OrganizerStats>),
    /// A request could not be served.
    Error {
        /// Human-readable reason.
        message: String,
    },
    /// The handshake was rejected; the socket is about to close.
    AuthError {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerEvent {
    /// A pong stamped with the current time.
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// An error frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Handshake rejection, sent right before the close frame.
    pub fn auth_error(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    /// Encode as a text frame.
    pub fn to_frame(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(frame) => Some(frame),
            Err(e) => {
                error!(error = %e, "Failed to serialize server event");
                None
            }
        }
    }
}

/// Encode a relayed bus event, keeping the producer's payload untouched.
pub fn relay_frame(event: &str, data: &Value) -> Option<String> {
    #[derive(Serialize)]
    struct Relay<'a> {
        event: &'a str,
        data: &'a Value,
    }

    match serde_json::to_string(&Relay { event, data }) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!(event, error = %e, "Failed to serialize relayed event");
            None
        }
    }
}
