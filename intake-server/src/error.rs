//! API error taxonomy and its HTTP mapping.
//!
//! Every error renders as `{"error": "<short message>"}`. Internal details
//! such as database errors are logged but never returned to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::delivery::DeliveryError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No or invalid caller identity
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad or expired voice credential
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Webhook rejected the contact or could not be reached
    #[error(transparent)]
    UpstreamDelivery(#[from] DeliveryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UpstreamDelivery(DeliveryError::Rejected { .. }) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamDelivery(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::UpstreamDelivery(DeliveryError::Rejected { status }) => {
                format!("Webhook failed with status {status}")
            }
            ApiError::UpstreamDelivery(_) => "Failed to send test webhook".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status_code = status.as_u16(), error = %self, "request_failed");
        } else {
            warn!(status_code = status.as_u16(), error = %self, "request_rejected");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
