//! Owner session verification.
//!
//! The identity provider issues HS256 access tokens carrying the account id in
//! `sub`. They are verified with the provider's shared secret.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::jwt::Hs256Key;
use super::TokenError;
use crate::config::SecretString;

/// Claims read from an identity provider access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id
    pub sub: String,

    /// Expiry time in epoch seconds
    pub exp: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The authenticated account behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerIdentity {
    pub user_id: String,
}

/// Verifies identity provider access tokens.
#[derive(Debug, Clone)]
pub struct SessionVerifier {
    key: Hs256Key,
}

impl SessionVerifier {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: Hs256Key::new(secret.expose()),
        }
    }

    pub fn verify(&self, token: &str, now: u64) -> Result<OwnerIdentity, TokenError> {
        let claims: SessionClaims = self.key.verify(token)?;

        if claims.sub.trim().is_empty() {
            return Err(TokenError::Invalid("empty subject".to_string()));
        }

        if now >= claims.exp {
            warn!(user_id = %claims.sub, expires_at = claims.exp, "owner_session_expired");
            return Err(TokenError::Expired);
        }

        Ok(OwnerIdentity {
            user_id: claims.sub,
        })
    }
}
