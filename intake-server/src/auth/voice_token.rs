//! Voice session tokens.
//!
//! A voice token binds one tenant slug to a fixed ten-minute window. It is
//! minted for the tenant owner and handed to the client-side voice SDK, which
//! presents it as a bearer token when submitting the captured contact.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::jwt::Hs256Key;
use super::TokenError;
use crate::config::SecretString;

/// Lifetime of a voice token in seconds.
pub const VOICE_TOKEN_TTL_SECS: u64 = 600;

/// Claims carried by a voice token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceClaims {
    /// Tenant slug the session is scoped to
    pub slug: String,

    /// Issue time in epoch seconds
    #[serde(rename = "iat")]
    pub issued_at: u64,

    /// Expiry time in epoch seconds (`issued_at + 600`)
    #[serde(rename = "exp")]
    pub expires_at: u64,
}

/// Mints and verifies voice tokens with the process-wide voice secret.
#[derive(Debug, Clone)]
pub struct VoiceTokenIssuer {
    key: Hs256Key,
}

impl VoiceTokenIssuer {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: Hs256Key::new(secret.expose()),
        }
    }

    /// Issue a token for `slug` valid from `now` for [`VOICE_TOKEN_TTL_SECS`].
    pub fn issue(&self, slug: &str, now: u64) -> Result<String, TokenError> {
        let claims = VoiceClaims {
            slug: slug.to_string(),
            issued_at: now,
            expires_at: now + VOICE_TOKEN_TTL_SECS,
        };
        let token = self.key.sign(&claims)?;
        debug!(slug = %slug, expires_at = claims.expires_at, "voice_token_issued");
        Ok(token)
    }

    /// Verify a token at time `now`, returning its claims.
    ///
    /// The token is rejected at or after `expires_at`, and by the signature
    /// check once the system clock has passed it.
    pub fn verify(&self, token: &str, now: u64) -> Result<VoiceClaims, TokenError> {
        let claims: VoiceClaims = self.key.verify(token)?;
        if now >= claims.expires_at {
            warn!(
                slug = %claims.slug,
                expires_at = claims.expires_at,
                now = now,
                "voice_token_expired"
            );
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
