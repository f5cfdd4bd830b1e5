//! CRM webhook delivery.
//!
//! A contact is delivered with a single JSON POST to the tenant's webhook.
//! Nothing is retried. What a failure means to the caller depends on the
//! [`DeliveryPolicy`]:
//! - [`DeliveryPolicy::BestEffort`]: the failure is recorded as
//!   [`DeliveryStatus::Error`] and the request still completes (voice intake)
//! - [`DeliveryPolicy::Strict`]: the failure is returned to the caller (test-send)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::contact::WebhookContact;

/// Longest response body excerpt kept in logs.
const MAX_LOGGED_BODY: usize = 512;

/// Outcome recorded for one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Error,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Error => "error",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryStatus::Sent),
            "error" => Ok(DeliveryStatus::Error),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

/// Why a webhook delivery failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook responded with status {status}")]
    Rejected { status: u16 },

    #[error("webhook request timed out")]
    Timeout,

    #[error("webhook request failed: {0}")]
    Transport(String),
}

/// How a delivery failure is treated by the calling operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Absorb failures into [`DeliveryStatus::Error`]
    BestEffort,
    /// Propagate failures to the caller
    Strict,
}

impl DeliveryPolicy {
    /// Resolve a delivery result under this policy.
    pub fn apply(
        self,
        result: Result<(), DeliveryError>,
    ) -> Result<DeliveryStatus, DeliveryError> {
        match (self, result) {
            (_, Ok(())) => Ok(DeliveryStatus::Sent),
            (DeliveryPolicy::BestEffort, Err(_)) => Ok(DeliveryStatus::Error),
            (DeliveryPolicy::Strict, Err(e)) => Err(e),
        }
    }
}

/// HTTP client for CRM webhooks.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: Client,
    timeout: Duration,
}

impl WebhookClient {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(concat!("voxlead/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, timeout })
    }

    /// POST `contact` as JSON to `url`.
    ///
    /// Any 2xx response is a success; everything else is a [`DeliveryError`].
    pub async fn deliver(&self, url: &str, contact: &WebhookContact) -> Result<(), DeliveryError> {
        info!(
            has_tag = contact.tag.is_some(),
            timeout_seconds = self.timeout.as_secs_f64(),
            "webhook_delivery_starting"
        );

        let response = match self.http.post(url).json(contact).send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    error!(
                        timeout_seconds = self.timeout.as_secs_f64(),
                        error = %e,
                        "webhook_delivery_timeout"
                    );
                    return Err(DeliveryError::Timeout);
                }
                error!(error = %e, "webhook_delivery_request_error");
                return Err(DeliveryError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        if status.is_success() {
            info!(status_code = status.as_u16(), "webhook_delivery_complete");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!(
            status_code = status.as_u16(),
            body = %truncate(&body, MAX_LOGGED_BODY),
            "webhook_delivery_rejected"
        );
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
        })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
