//! Request-level operations, independent of the HTTP layer.
//!
//! Each operation takes its collaborators explicitly (store, webhook client,
//! token issuer) so it can be exercised without a running server.

pub mod intake;
pub mod tenants;

pub use intake::{accept_intake, send_test, IntakeOutcome, DELIVERY_FAILED_MESSAGE};
pub use tenants::{
    is_valid_slug, issue_voice_token, load_dashboard, parse_webhook_url, register_tenant,
    Dashboard, TenantRequest, DASHBOARD_INTAKE_LIMIT,
};
