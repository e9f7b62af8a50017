//! Socket connection lifecycle: authentication, handles, pool, and manager.

pub mod authenticator;
pub mod handle;
pub mod manager;
pub mod pool;

pub use authenticator::{AuthenticatedConnection, SocketAuthenticator};
pub use handle::{ConnectionHandle, ConnectionId};
pub use manager::ConnectionManager;
