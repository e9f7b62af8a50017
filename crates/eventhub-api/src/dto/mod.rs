//! Response bodies.

pub mod response;

pub use response::{ApiResponse, DetailedHealthResponse, HealthResponse};
