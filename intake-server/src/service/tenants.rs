//! Owner-facing tenant operations: setup, dashboard, voice token issuance.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::auth::{OwnerIdentity, VoiceTokenIssuer};
use crate::error::ApiError;
use crate::store::{Intake, NewTenant, Store, StoreError, Tenant};

/// Number of intakes shown on the dashboard.
pub const DASHBOARD_INTAKE_LIMIT: i64 = 20;

const SLUG_MIN_LEN: usize = 3;
const SLUG_MAX_LEN: usize = 20;

/// Request body for tenant setup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantRequest {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub default_tag: Option<String>,
}

/// The owner's tenant together with its latest intakes.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub tenant: Tenant,
    pub intakes: Vec<Intake>,
}

/// Whether `slug` is 3 to 20 characters of `[a-z0-9-]`.
pub fn is_valid_slug(slug: &str) -> bool {
    (SLUG_MIN_LEN..=SLUG_MAX_LEN).contains(&slug.len())
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Parse a webhook URL, accepting only absolute http(s) URLs.
pub fn parse_webhook_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Some(url),
        _ => None,
    }
}

/// Mint a voice token for a slug the caller owns.
///
/// A slug that exists but belongs to someone else is reported as not found.
pub async fn issue_voice_token(
    store: &dyn Store,
    issuer: &VoiceTokenIssuer,
    owner: &OwnerIdentity,
    slug: &str,
    now: u64,
) -> Result<String, ApiError> {
    let tenant = store.find_owned_tenant(&owner.user_id, slug).await?;
    if tenant.is_none() {
        warn!(slug = %slug, user_id = %owner.user_id, "voice_token_tenant_not_owned");
        return Err(ApiError::not_found("Tenant not found or unauthorized"));
    }

    let token = issuer
        .issue(slug, now)
        .map_err(|e| ApiError::internal(format!("failed to sign voice token: {e}")))?;

    info!(slug = %slug, "voice_token_issued");
    Ok(token)
}

/// Register the caller's tenant.
pub async fn register_tenant(
    store: &dyn Store,
    owner: &OwnerIdentity,
    request: TenantRequest,
) -> Result<Tenant, ApiError> {
    let slug = request.slug.unwrap_or_default();
    if !is_valid_slug(&slug) {
        return Err(ApiError::bad_request(
            "Slug must be 3-20 characters, lowercase letters, numbers, and hyphens only",
        ));
    }

    let webhook_url = request
        .webhook_url
        .as_deref()
        .and_then(parse_webhook_url)
        .ok_or_else(|| ApiError::bad_request("Please enter a valid webhook URL"))?;

    let default_tag = request
        .default_tag
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let new_tenant = NewTenant {
        owner_user_id: owner.user_id.clone(),
        slug,
        webhook_url: webhook_url.to_string(),
        default_tag,
    };

    let tenant = store
        .create_tenant(new_tenant)
        .await
        .map_err(|e| match e {
            StoreError::SlugTaken => {
                ApiError::conflict("This slug is already taken. Please choose another.")
            }
            StoreError::OwnerHasTenant => ApiError::conflict("Account already has a tenant"),
            other => ApiError::from(other),
        })?;

    info!(
        slug = %tenant.slug,
        tenant_id = %tenant.id,
        has_default_tag = tenant.default_tag.is_some(),
        "tenant_registered"
    );
    Ok(tenant)
}

/// Load the caller's tenant and its most recent intakes.
pub async fn load_dashboard(store: &dyn Store, owner: &OwnerIdentity) -> Result<Dashboard, ApiError> {
    let tenant = store
        .find_tenant_by_owner(&owner.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    let intakes = store
        .recent_intakes(tenant.id, DASHBOARD_INTAKE_LIMIT)
        .await?;

    Ok(Dashboard { tenant, intakes })
}
