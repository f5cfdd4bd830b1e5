//! Contact capture: payload types and the transforms applied before a
//! contact is forwarded to a CRM.
//!
//! ```text
//! ContactPayload → split_full_name() + normalize_phone() → WebhookContact
//! ```

pub mod name;
pub mod phone;
pub mod types;

pub use name::{split_full_name, SplitName};
pub use phone::normalize_phone;
pub use types::{ContactPayload, WebhookContact};
