//! Concrete repository implementations.

pub mod stats;

pub use stats::StatsRepository;
