//! HTTP endpoint handlers.
//!
//! Handlers only extract credentials and bodies, call into [`crate::service`],
//! and shape the JSON response. Errors render through [`ApiError`].

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::extract::{JsonBody, OwnerSession, VoiceSession};
use crate::auth::{unix_now, SessionVerifier, VoiceTokenIssuer};
use crate::contact::ContactPayload;
use crate::delivery::WebhookClient;
use crate::error::ApiError;
use crate::service::{self, Dashboard, IntakeOutcome, TenantRequest};
use crate::store::{Store, Tenant};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub webhook: WebhookClient,
    pub voice_tokens: Arc<VoiceTokenIssuer>,
    pub sessions: Arc<SessionVerifier>,
}

impl AppState {
    /// Build state from configuration, deriving signing keys and the webhook
    /// client from it.
    pub fn new(config: Config, store: Arc<dyn Store>) -> Result<Self, reqwest::Error> {
        let webhook = WebhookClient::new(config.webhook_timeout())?;
        let voice_tokens = Arc::new(VoiceTokenIssuer::new(&config.voice_token_secret));
        let sessions = Arc::new(SessionVerifier::new(&config.auth_jwt_secret));

        Ok(Self {
            config: Arc::new(config),
            store,
            webhook,
            voice_tokens,
            sessions,
        })
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Voice Token
// =============================================================================

/// Body naming a tenant slug.
#[derive(Debug, Deserialize)]
pub struct SlugRequest {
    #[serde(default)]
    pub slug: Option<String>,
}

impl SlugRequest {
    fn require_slug(&self) -> Result<&str, ApiError> {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request("Slug is required"))
    }
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

/// Issue a voice session token for a slug the caller owns.
pub async fn issue_voice_token(
    State(state): State<AppState>,
    OwnerSession(owner): OwnerSession,
    JsonBody(body): JsonBody<SlugRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let slug = body.require_slug()?;
    let token = service::issue_voice_token(
        state.store.as_ref(),
        &state.voice_tokens,
        &owner,
        slug,
        unix_now(),
    )
    .await?;

    Ok(Json(TokenResponse {
        success: true,
        token,
    }))
}

// =============================================================================
// Voice Intake
// =============================================================================

/// Accept a contact captured by the voice client.
///
/// Returns 200 even when the CRM webhook fails; `success` reports delivery.
pub async fn voice_intake(
    State(state): State<AppState>,
    VoiceSession(claims): VoiceSession,
    JsonBody(body): JsonBody<serde_json::Value>,
) -> Result<Json<IntakeOutcome>, ApiError> {
    let payload = ContactPayload::from_raw(body).map_err(|e| {
        warn!(slug = %claims.slug, error = %e, "request_body_invalid");
        ApiError::bad_request("Invalid JSON body")
    })?;

    let outcome =
        service::accept_intake(state.store.as_ref(), &state.webhook, &claims.slug, payload)
            .await?;

    info!(slug = %claims.slug, success = outcome.success, "intake_complete");
    Ok(Json(outcome))
}

// =============================================================================
// Test Send
// =============================================================================

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Send a synthetic contact to the caller's webhook.
pub async fn send_test(
    State(state): State<AppState>,
    OwnerSession(owner): OwnerSession,
    JsonBody(body): JsonBody<SlugRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let slug = body.require_slug()?;
    service::send_test(state.store.as_ref(), &state.webhook, &owner, slug).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Tenants
// =============================================================================

#[derive(Serialize)]
pub struct TenantResponse {
    pub success: bool,
    pub tenant: Tenant,
}

/// Register the caller's tenant.
pub async fn create_tenant(
    State(state): State<AppState>,
    OwnerSession(owner): OwnerSession,
    JsonBody(body): JsonBody<TenantRequest>,
) -> Result<(StatusCode, Json<TenantResponse>), ApiError> {
    let tenant = service::register_tenant(state.store.as_ref(), &owner, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(TenantResponse {
            success: true,
            tenant,
        }),
    ))
}

/// The caller's tenant with its recent intakes.
pub async fn dashboard(
    State(state): State<AppState>,
    OwnerSession(owner): OwnerSession,
) -> Result<Json<Dashboard>, ApiError> {
    let dashboard = service::load_dashboard(state.store.as_ref(), &owner).await?;
    Ok(Json(dashboard))
}
