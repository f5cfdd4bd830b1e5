//! HS256 JSON Web Tokens.
//!
//! Thin wrapper over `jsonwebtoken` pinning the algorithm to HS256, requiring
//! an `exp` claim and disabling expiry leeway.

use std::fmt;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use super::TokenError;

/// Shared-secret key pair used to sign and verify tokens.
#[derive(Clone)]
pub struct Hs256Key {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for Hs256Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hs256Key").finish_non_exhaustive()
    }
}

impl Hs256Key {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        // Identity provider tokens carry an `aud` we do not pin.
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `claims` into a compact token.
    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(|e| {
            error!(error = %e, "jwt_encode_failed");
            TokenError::from(e)
        })
    }

    /// Verify signature, algorithm and `exp` against the system clock, and
    /// decode the claims.
    ///
    /// Callers holding an explicit `now` re-check expiry themselves; at
    /// `now == exp` the token is already expired there.
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        let data = decode::<C>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "jwt_decode_failed");
            TokenError::from(e)
        })?;
        Ok(data.claims)
    }
}
