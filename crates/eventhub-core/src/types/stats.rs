//! Aggregate statistics pushed to dashboard clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform-wide counters shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    /// Registered users.
    pub total_users: i64,
    /// All events.
    pub total_events: i64,
    /// Events that have not started yet.
    pub upcoming_events: i64,
    /// Confirmed registrations across all events.
    pub total_registrations: i64,
    /// Registration requests awaiting a decision.
    pub pending_requests: i64,
}

/// Counters scoped to the events owned by one organizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerStats {
    /// Events created by the organizer.
    pub total_events: i64,
    /// The organizer's events that have not finished yet.
    pub active_events: i64,
    /// Confirmed registrations on the organizer's events.
    pub total_registrations: i64,
    /// Registrations on the organizer's events created this calendar month.
    pub registrations_this_month: i64,
}

/// A computed aggregate stamped with the moment it was computed.
///
/// Snapshots are never stored; each interval tick or explicit request
/// recomputes one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot<T> {
    /// The aggregate counters.
    #[serde(flatten)]
    pub stats: T,
    /// When the aggregate was computed.
    pub updated_at: DateTime<Utc>,
}

impl<T> StatsSnapshot<T> {
    /// Stamp an aggregate with the current time.
    pub fn now(stats: T) -> Self {
        Self {
            stats,
            updated_at: Utc::now(),
        }
    }
}
