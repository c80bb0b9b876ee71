//! Authentication ports. Sessions and logins live outside the engine; it
//! only asks who is calling.

use uuid::Uuid;

use crate::domain::Identity;
use crate::error::FeedError;

/// Supplies the identity of the current caller, if any.
pub trait AuthProvider: Send + Sync {
    fn current(&self) -> Option<Identity>;

    fn require(&self) -> Result<Identity, FeedError> {
        self.current().ok_or(FeedError::AuthRequired)
    }
}

/// A per-request identity resolved elsewhere (e.g. from a bearer token).
impl AuthProvider for Option<Identity> {
    fn current(&self) -> Option<Identity> {
        self.clone()
    }
}

impl AuthProvider for Identity {
    fn current(&self) -> Option<Identity> {
        Some(self.clone())
    }
}

/// Claims carried by access tokens.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub display_name: String,
    pub exp: i64,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Identity::new(claims.user_id, claims.display_name)
    }
}

/// Token service trait for bearer-token operations.
pub trait TokenService: Send + Sync {
    fn generate_token(&self, user_id: Uuid, display_name: &str) -> Result<String, AuthError>;

    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError>;

    fn expiration_seconds(&self) -> i64;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing authorization header")]
    MissingAuth,
}
