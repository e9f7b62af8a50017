//! JWT claims structure carried by access tokens.

use serde::{Deserialize, Serialize};

use eventhub_core::types::{UserId, UserRole};

/// JWT claims payload embedded in every access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The user ID.
    pub id: UserId,
    /// User role at the time of token issuance.
    pub role: UserRole,
    /// Display name.
    pub name: String,
    /// Issued-at timestamp (seconds since epoch); 0 when absent.
    #[serde(default)]
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}
