//! # eventhub-core
//!
//! Core crate for the EventHub realtime gateway. Contains configuration
//! schemas, typed identifiers and roles, the pub/sub bus envelopes,
//! statistics payloads, the seams implemented by other crates
//! ([`traits::MessageBus`], [`traits::StatsProvider`]), and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other EventHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
