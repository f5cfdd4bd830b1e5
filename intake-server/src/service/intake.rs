//! Contact intake and test-send.
//!
//! Both operations deliver a contact to the tenant's CRM webhook and log one
//! intake row. They differ only in [`DeliveryPolicy`]: a voice intake never
//! fails because the CRM is flaky, a test-send reports exactly that.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::auth::OwnerIdentity;
use crate::contact::{ContactPayload, WebhookContact};
use crate::delivery::{DeliveryError, DeliveryPolicy, DeliveryStatus, WebhookClient};
use crate::error::ApiError;
use crate::store::{NewIntake, Store, Tenant};

/// Prefix of the message returned when a voice intake could not be forwarded.
pub const DELIVERY_FAILED_MESSAGE: &str = "Failed to send to webhook";

/// Result of a voice intake as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntakeOutcome {
    fn sent() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Failed delivery. Transport details stay in the logs since they can
    /// name internal hosts.
    fn failed(err: &DeliveryError) -> Self {
        let error = match err {
            DeliveryError::Rejected { .. } | DeliveryError::Timeout => {
                format!("{DELIVERY_FAILED_MESSAGE}: {err}")
            }
            DeliveryError::Transport(_) => DELIVERY_FAILED_MESSAGE.to_string(),
        };
        Self {
            success: false,
            error: Some(error),
        }
    }
}

/// Accept a voice-captured contact for the slug bound to the caller's token.
///
/// Validation, slug binding and tenant lookup failures are returned as
/// errors. Delivery failures are not: they are recorded on the intake row
/// and reported through [`IntakeOutcome::success`].
pub async fn accept_intake(
    store: &dyn Store,
    webhook: &WebhookClient,
    token_slug: &str,
    payload: ContactPayload,
) -> Result<IntakeOutcome, ApiError> {
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        warn!(slug = %token_slug, missing = ?missing, "intake_missing_fields");
        return Err(ApiError::bad_request("Missing required fields"));
    }

    let slug = payload.slug.as_deref().unwrap_or_default();
    if slug != token_slug {
        warn!(
            token_slug = %token_slug,
            payload_slug = %slug,
            "intake_slug_mismatch"
        );
        return Err(ApiError::bad_request("Slug mismatch"));
    }

    let tenant = store
        .find_tenant_by_slug(slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    let contact = WebhookContact::from_payload(&payload, tenant.default_tag.clone());

    info!(
        slug = %slug,
        tenant_id = %tenant.id,
        has_tag = contact.tag.is_some(),
        duration_sec = ?payload.duration_sec,
        "intake_received"
    );

    let result = webhook.deliver(&tenant.webhook_url, &contact).await;
    let outcome = match &result {
        Ok(()) => IntakeOutcome::sent(),
        Err(e) => {
            warn!(slug = %slug, error = %e, "intake_delivery_failed");
            IntakeOutcome::failed(e)
        }
    };
    let status = DeliveryPolicy::BestEffort.apply(result)?;

    record_intake(
        store,
        &tenant,
        payload.to_record(),
        payload.recorded_duration(),
        status,
    )
    .await;

    Ok(outcome)
}

/// Deliver a synthetic contact to the owner's webhook.
///
/// Any delivery failure is returned to the caller. A successful send is
/// logged as a `sent` intake.
pub async fn send_test(
    store: &dyn Store,
    webhook: &WebhookClient,
    owner: &OwnerIdentity,
    slug: &str,
) -> Result<(), ApiError> {
    let tenant = store
        .find_owned_tenant(&owner.user_id, slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found or unauthorized"))?;

    let payload = ContactPayload::synthetic_test(slug);
    let tag = tenant.default_tag.as_deref().map(|t| format!("{t}-Test"));
    let contact = WebhookContact::from_payload(&payload, tag);

    info!(slug = %slug, tenant_id = %tenant.id, "test_send_starting");

    let result = webhook.deliver(&tenant.webhook_url, &contact).await;
    let status = DeliveryPolicy::Strict.apply(result)?;

    record_intake(store, &tenant, payload.to_record(), None, status).await;

    info!(slug = %slug, "test_send_complete");
    Ok(())
}

/// Log an intake row. Failures are logged and otherwise ignored.
async fn record_intake(
    store: &dyn Store,
    tenant: &Tenant,
    payload: serde_json::Value,
    duration_sec: Option<i32>,
    status: DeliveryStatus,
) {
    let new_intake = NewIntake {
        tenant_id: tenant.id,
        payload,
        duration_sec,
        status,
    };

    match store.insert_intake(new_intake).await {
        Ok(intake) => info!(
            slug = %tenant.slug,
            intake_id = %intake.id,
            status = %status,
            "intake_recorded"
        ),
        // TODO: surface persistent log-write failures through a health/readiness signal
        Err(e) => error!(
            slug = %tenant.slug,
            status = %status,
            error = %e,
            "intake_record_failed"
        ),
    }
}
