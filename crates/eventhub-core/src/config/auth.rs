//! Token verification configuration.

use serde::{Deserialize, Serialize};

/// Access-token configuration.
///
/// Tokens are issued by the API collaborator; the gateway only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for JWT verification (HMAC-SHA256).
    pub jwt_secret: String,
    /// Access token TTL in minutes (used when minting development tokens).
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl_minutes: u64,
    /// Clock-skew leeway applied to expiry checks, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
    /// Name of the cookie carrying the access token.
    #[serde(default = "default_cookie_name")]
    pub access_cookie_name: String,
}

fn default_access_ttl() -> u64 {
    15
}

fn default_leeway() -> u64 {
    5
}

fn default_cookie_name() -> String {
    "accessToken".to_string()
}
