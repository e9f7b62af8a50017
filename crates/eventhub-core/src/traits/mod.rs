//! Core traits defined in `eventhub-core` and implemented by other crates.

pub mod bus;
pub mod stats;

pub use bus::{BusStream, MessageBus};
pub use stats::StatsProvider;
