//! Token signing and verification.
//!
//! - [`voice_token`]: short-lived tokens scoping a voice session to one slug
//! - [`session`]: identity provider access tokens proving who the owner is
//!
//! Both are HS256 JWTs handled by [`jwt`].

pub mod jwt;
pub mod session;
pub mod voice_token;

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use thiserror::Error;

pub use jwt::Hs256Key;
pub use session::{OwnerIdentity, SessionClaims, SessionVerifier};
pub use voice_token::{VoiceClaims, VoiceTokenIssuer, VOICE_TOKEN_TTL_SECS};

/// Why a token was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(err.to_string()),
        }
    }
}

/// Current time in epoch seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
