//! Socket authentication: validates the access token presented at handshake.

use std::sync::Arc;

use eventhub_auth::jwt::JwtDecoder;
use eventhub_core::error::AppError;
use eventhub_core::types::{UserId, UserRole};

/// Identity extracted from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedConnection {
    /// User ID.
    pub user_id: UserId,
    /// User role.
    pub role: UserRole,
    /// Display name.
    pub name: String,
}

/// Authenticates socket handshakes using access tokens.
#[derive(Clone)]
pub struct SocketAuthenticator {
    decoder: Arc<JwtDecoder>,
}

impl std::fmt::Debug for SocketAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketAuthenticator").finish()
    }
}

impl SocketAuthenticator {
    /// Creates a new socket authenticator.
    pub fn new(decoder: Arc<JwtDecoder>) -> Self {
        Self { decoder }
    }

    /// Pick the token to verify: the handshake payload wins over the cookie.
    ///
    /// Blank values count as absent.
    pub fn select_token<'a>(handshake: Option<&'a str>, cookie: Option<&'a str>) -> Option<&'a str> {
        handshake
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| cookie.map(str::trim).filter(|t| !t.is_empty()))
    }

    /// Verifies the token and returns the socket identity.
    pub fn authenticate(&self, token: Option<&str>) -> Result<AuthenticatedConnection, AppError> {
        let token = token.ok_or_else(|| AppError::authentication("Authentication required"))?;
        let claims = self.decoder.decode_access_token(token)?;

        Ok(AuthenticatedConnection {
            user_id: claims.id,
            role: claims.role,
            name: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_auth::jwt::JwtEncoder;
    use eventhub_core::config::AuthConfig;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            jwt_access_ttl_minutes: 15,
            leeway_seconds: 0,
            access_cookie_name: "accessToken".into(),
        }
    }

    fn authenticator() -> SocketAuthenticator {
        SocketAuthenticator::new(Arc::new(JwtDecoder::new(&auth_config())))
    }

    #[test]
    fn test_select_token_prefers_handshake() {
        assert_eq!(
            SocketAuthenticator::select_token(Some("a"), Some("b")),
            Some("a")
        );
        assert_eq!(
            SocketAuthenticator::select_token(Some("  "), Some("b")),
            Some("b")
        );
        assert_eq!(SocketAuthenticator::select_token(None, None), None);
    }

    #[test]
    fn test_missing_token() {
        let err = authenticator().authenticate(None).unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(err.message, "Authentication required");
    }

    #[test]
    fn test_valid_token_yields_identity() {
        let (token, _) = JwtEncoder::new(&auth_config())
            .generate_access_token(UserId::new(42), UserRole::Admin, "Root")
            .unwrap();

        let identity = authenticator().authenticate(Some(&token)).unwrap();
        assert_eq!(
            identity,
            AuthenticatedConnection {
                user_id: UserId::new(42),
                role: UserRole::Admin,
                name: "Root".into(),
            }
        );
    }

    #[test]
    fn test_expired_token_fails_closed() {
        let (token, _) = JwtEncoder::new(&auth_config())
            .with_ttl_minutes(-60)
            .generate_access_token(UserId::new(42), UserRole::User, "Late")
            .unwrap();

        let err = authenticator().authenticate(Some(&token)).unwrap_err();
        assert_eq!(err.message, "Token has expired");
    }
}
