//! Voxlead - voice contact intake for event organizers.
//!
//! An organizer ("tenant") registers a slug and a CRM webhook. Attendees talk
//! to a voice client that captures their contact details and submits them here;
//! the service normalizes the contact, forwards it to the tenant's webhook and
//! logs the outcome.
//!
//! ## Flow
//!
//! ```text
//! Owner → /token → voice token → Voice client → /intake → CRM webhook
//!                                                       ↘ intakes log
//! ```

pub mod auth;
pub mod config;
pub mod contact;
pub mod delivery;
pub mod error;
pub mod service;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use contact::{normalize_phone, split_full_name, ContactPayload, WebhookContact};
pub use delivery::{DeliveryPolicy, DeliveryStatus, WebhookClient};
pub use error::ApiError;
pub use store::{MemoryStore, PgStore, Store};
pub use web::{router, AppState};
