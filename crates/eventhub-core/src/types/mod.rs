//! Shared domain types: identifiers, roles, and statistics payloads.

pub mod id;
pub mod role;
pub mod stats;

pub use id::{EventId, UserId};
pub use role::UserRole;
pub use stats::{AdminStats, OrganizerStats, StatsSnapshot};
