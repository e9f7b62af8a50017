//! Envelopes exchanged over the pub/sub bus.
//!
//! API processes publish these through the publisher facade; every gateway
//! instance subscribed to the bus decodes them and fans them out to rooms.

pub mod envelope;

pub use envelope::{AdminBusMessage, BusChannels, BusDelivery, BusMessage, BusPayload, BusTarget};
