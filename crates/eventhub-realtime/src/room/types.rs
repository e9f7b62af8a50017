//! Room type definitions and naming conventions.

use std::fmt;
use std::str::FromStr;

use eventhub_core::error::AppError;
use eventhub_core::types::{EventId, UserId, UserRole};

/// A named broadcast group of sockets.
///
/// Names follow `user_{id}`, `role_{ROLE}` and `event_{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Every socket of one user. Joined on authentication.
    User(UserId),
    /// Every socket whose user holds the role. Joined on authentication.
    Role(UserRole),
    /// Sockets that asked to follow an event.
    Event(EventId),
}

impl Room {
    /// The room every admin socket joins.
    pub const ADMINS: Room = Room::Role(UserRole::Admin);

    /// Rooms joined automatically after authentication.
    pub fn defaults_for(user_id: UserId, role: UserRole) -> [Room; 2] {
        [Room::User(user_id), Room::Role(role)]
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user_{id}"),
            Self::Role(role) => write!(f, "role_{role}"),
            Self::Event(id) => write!(f, "event_{id}"),
        }
    }
}

impl FromStr for Room {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("Invalid room name: '{s}'"));
        let (kind, rest) = s.split_once('_').ok_or_else(invalid)?;
        match kind {
            "user" => rest.parse().map(Self::User).map_err(|_| invalid()),
            "role" if rest == rest.to_uppercase() => rest.parse().map(Self::Role),
            "event" => rest.parse().map(Self::Event).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}
