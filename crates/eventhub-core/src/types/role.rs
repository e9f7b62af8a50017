//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles carried in access tokens and used for `role_{ROLE}` rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    /// Platform administrator.
    Admin,
    /// Creates and manages events.
    Organizer,
    /// Regular attendee.
    User,
}

impl UserRole {
    /// Whether this role may request dashboard statistics.
    pub fn can_view_dashboard(&self) -> bool {
        matches!(self, Self::Admin | Self::Organizer)
    }

    /// Return the role as an uppercase string, as used in room names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Organizer => "ORGANIZER",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = crate::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "ORGANIZER" => Ok(Self::Organizer),
            "USER" => Ok(Self::User),
            _ => Err(crate::AppError::validation(format!(
                "Invalid user role: '{s}'. Expected one of: ADMIN, ORGANIZER, USER"
            ))),
        }
    }
}
