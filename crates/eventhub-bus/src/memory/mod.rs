//! In-memory bus provider.

pub mod bus;

pub use bus::MemoryMessageBus;
