//! # eventhub-database
//!
//! PostgreSQL connection management and the read-only aggregate queries
//! behind the dashboard statistics. The booking platform owns the schema;
//! this crate never writes.

pub mod connection;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::StatsRepository;
