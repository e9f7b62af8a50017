//! Access-token minting for local development and tests.

use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use eventhub_core::config::AuthConfig;
use eventhub_core::error::AppError;
use eventhub_core::types::{UserId, UserRole};

use super::claims::Claims;

/// Creates signed access tokens with the configured TTL.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Access token TTL in minutes.
    access_ttl_minutes: i64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl_minutes: config.jwt_access_ttl_minutes as i64,
        }
    }

    /// Override the TTL, e.g. to mint an already-expired token.
    pub fn with_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_ttl_minutes = minutes;
        self
    }

    /// Generates an access token for the given identity.
    pub fn generate_access_token(
        &self,
        user_id: UserId,
        role: UserRole,
        name: &str,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let now = Utc::now();
        let exp = now + chrono::Duration::minutes(self.access_ttl_minutes);

        let claims = Claims {
            id: user_id,
            role,
            name: name.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))?;

        Ok((token, exp))
    }
}
