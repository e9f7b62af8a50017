//! Redis pub/sub bus provider.

pub mod client;
pub mod pubsub;

pub use client::RedisBusClient;
pub use pubsub::RedisMessageBus;
