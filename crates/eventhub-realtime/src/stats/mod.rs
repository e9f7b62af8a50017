//! Dashboard statistics broadcasting.

pub mod broadcaster;
pub mod task;

pub use broadcaster::StatsBroadcaster;
pub use task::StatsTask;
