//! Request extractors for the two kinds of bearer credentials.

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::auth::{unix_now, OwnerIdentity, VoiceClaims};
use crate::error::ApiError;
use crate::web::AppState;

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// An authenticated tenant owner.
#[derive(Debug, Clone)]
pub struct OwnerSession(pub OwnerIdentity);

#[async_trait]
impl FromRequestParts<AppState> for OwnerSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;

        match state.sessions.verify(token, unix_now()) {
            Ok(identity) => Ok(OwnerSession(identity)),
            Err(e) => {
                warn!(error = %e, "owner_session_invalid");
                Err(ApiError::Unauthorized)
            }
        }
    }
}

/// A verified voice session token.
#[derive(Debug, Clone)]
pub struct VoiceSession(pub VoiceClaims);

#[async_trait]
impl FromRequestParts<AppState> for VoiceSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;

        match state.voice_tokens.verify(token, unix_now()) {
            Ok(claims) => Ok(VoiceSession(claims)),
            Err(e) => {
                warn!(error = %e, "voice_token_invalid");
                Err(ApiError::InvalidToken)
            }
        }
    }
}

/// JSON body whose rejections render as [`ApiError::BadRequest`].
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    warn!(error = %rejection.body_text(), "request_body_invalid");
    ApiError::bad_request("Invalid JSON body")
}
