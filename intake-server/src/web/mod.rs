//! Web server module.
//!
//! - `POST /token`: owner mints a voice token for one of their slugs
//! - `POST /intake`: voice client submits a captured contact
//! - `POST /test-send`: owner checks their webhook with a synthetic contact
//! - `POST /tenants`, `GET /tenants/me`: tenant setup and dashboard
//! - `GET /health`: liveness

pub mod extract;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use extract::{JsonBody, OwnerSession, VoiceSession};
pub use handlers::{
    create_tenant, dashboard, health, issue_voice_token, send_test, voice_intake, AppState,
    HealthResponse, SlugRequest, SuccessResponse, TenantResponse, TokenResponse,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/token", post(issue_voice_token))
        .route("/intake", post(voice_intake))
        .route("/test-send", post(send_test))
        .route("/tenants", post(create_tenant))
        .route("/tenants/me", get(dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
