//! # eventhub-bus
//!
//! Message bus backends and the producer-side publisher for EventHub.
//!
//! - **redis**: Redis PUBLISH/SUBSCRIBE, fan-out across gateway processes
//! - **memory**: in-process broadcast channels for single-node runs and tests
//!
//! The backend is selected at runtime based on configuration. API processes
//! use [`PublisherFacade`] to announce domain events; gateway processes
//! subscribe through [`BusManager`].

#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
pub mod publisher;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::BusManager;
pub use publisher::PublisherFacade;
