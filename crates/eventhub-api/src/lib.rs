//! # eventhub-api
//!
//! HTTP surface of the EventHub gateway built on Axum.
//!
//! Serves the `/ws` upgrade that hands sockets to the real-time engine,
//! plus liveness endpoints under `/api/health`.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
