//! Room routing: named groups of sockets used as broadcast targets.

pub mod membership;
pub mod registry;
pub mod types;

pub use registry::RoomRegistry;
pub use types::Room;
