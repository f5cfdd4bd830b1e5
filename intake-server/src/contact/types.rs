//! Contact payload types.
//!
//! This module defines:
//! - [`ContactPayload`]: what the voice client submits to `/intake`
//! - [`WebhookContact`]: what the CRM webhook receives

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use super::name::split_full_name;
use super::phone::normalize_phone;

/// Contact details captured during a voice conversation.
///
/// Every field is optional at the wire level so that missing fields surface as
/// validation errors rather than deserialization failures. Build it with
/// [`ContactPayload::from_raw`] to keep the body exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPayload {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub fun_fact: Option<String>,
    /// Conversation length in seconds, if the voice SDK reports it.
    /// Anything that is not a number or numeric string reads as unreported.
    #[serde(default, deserialize_with = "lenient_duration")]
    pub duration_sec: Option<f64>,
    /// Slug of the tenant the contact is meant for
    #[serde(default)]
    pub slug: Option<String>,
    /// Body as received, including keys not modelled above
    #[serde(skip)]
    pub raw: Option<Value>,
}

fn lenient_duration<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl ContactPayload {
    /// Read the typed view of a JSON body, keeping the body itself for the
    /// intake log.
    pub fn from_raw(raw: Value) -> Result<Self, serde_json::Error> {
        let mut payload = Self::deserialize(&raw)?;
        payload.raw = Some(raw);
        Ok(payload)
    }

    /// Synthetic contact used to verify a tenant's webhook configuration.
    pub fn synthetic_test(slug: &str) -> Self {
        Self {
            full_name: Some("Test Contact".to_string()),
            email: Some("test@example.com".to_string()),
            phone: Some("+15551234567".to_string()),
            business_name: Some("Test Business".to_string()),
            fun_fact: Some("This is a test contact from your voice networking app".to_string()),
            duration_sec: None,
            slug: Some(slug.to_string()),
            raw: None,
        }
    }

    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("slug", &self.slug),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }

    /// Duration to record in whole seconds.
    ///
    /// Fractions are rounded. Zero, negative and out-of-range durations are
    /// treated as unreported.
    pub fn recorded_duration(&self) -> Option<i32> {
        let secs = self.duration_sec?.round();
        (secs >= 1.0 && secs <= f64::from(i32::MAX)).then(|| secs as i32)
    }

    /// The payload as stored in the intake log.
    ///
    /// This is the received body when there is one, otherwise the typed
    /// fields.
    pub fn to_record(&self) -> Value {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }

        let mut record = json!({
            "full_name": self.full_name,
            "email": self.email,
            "phone": self.phone,
            "business_name": self.business_name,
            "fun_fact": self.fun_fact,
            "slug": self.slug,
        });
        if let Some(duration) = self.duration_sec {
            record["duration_sec"] = json!(duration);
        }
        record
    }
}

/// Contact as posted to the tenant's CRM webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// E.164 formatted phone number
    pub phone: String,
    pub business_name: String,
    pub fun_fact: String,
    /// Tenant tag, omitted entirely when the tenant has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl WebhookContact {
    /// Transform a captured payload into the CRM shape.
    ///
    /// Splits the full name and normalizes the phone number. Absent optional
    /// fields become empty strings.
    pub fn from_payload(payload: &ContactPayload, tag: Option<String>) -> Self {
        let name = split_full_name(payload.full_name.as_deref().unwrap_or_default());

        Self {
            first_name: name.first,
            last_name: name.last,
            email: payload.email.clone().unwrap_or_default(),
            phone: normalize_phone(payload.phone.as_deref().unwrap_or_default()),
            business_name: payload.business_name.clone().unwrap_or_default(),
            fun_fact: payload.fun_fact.clone().unwrap_or_default(),
            tag,
        }
    }
}
