//! Aggregate statistics source.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{AdminStats, OrganizerStats, UserId};

/// Read-only source of dashboard aggregates.
///
/// Implemented over the booking platform's relational store; tests supply
/// in-memory fakes.
#[async_trait]
pub trait StatsProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Platform-wide counters for the admin dashboard.
    async fn admin_stats(&self) -> AppResult<AdminStats>;

    /// Counters scoped to the events owned by `organizer`.
    async fn organizer_stats(&self, organizer: UserId) -> AppResult<OrganizerStats>;
}
