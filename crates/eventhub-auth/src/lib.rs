//! # eventhub-auth
//!
//! Access-token handling for the EventHub gateway. Tokens are issued by the
//! API collaborator; the gateway verifies them on every socket handshake.
//!
//! ## Modules
//!
//! - `jwt`: claims, HS256 verification, and token minting for local use

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
