//! # eventhub-realtime
//!
//! Real-time socket engine for the EventHub gateway. Provides:
//!
//! - Socket authentication against access tokens
//! - Presence tracking keyed by socket id (multi-tab aware)
//! - Room membership (`user_{id}`, `role_{ROLE}`, `event_{id}`)
//! - Fan-out of bus notifications to rooms
//! - Periodic and on-demand dashboard statistics
//!
//! All registries are owned by [`RealtimeEngine`]; nothing is global.

pub mod connection;
pub mod message;
pub mod metrics;
pub mod notification;
pub mod presence;
pub mod room;
pub mod server;
pub mod stats;

pub use connection::manager::ConnectionManager;
pub use notification::dispatcher::NotificationDispatcher;
pub use presence::tracker::PresenceTracker;
pub use room::registry::RoomRegistry;
pub use server::RealtimeEngine;
pub use stats::broadcaster::StatsBroadcaster;
