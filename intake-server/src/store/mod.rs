//! Tenant and intake persistence.
//!
//! The relational datastore sits behind the [`Store`] trait:
//! - [`PgStore`]: Postgres via sqlx, used by the server
//! - [`MemoryStore`]: in-process, used by tests

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::delivery::DeliveryStatus;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// An event organizer's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    /// Account id of the owner
    pub owner_user_id: String,
    /// Globally unique public identifier
    pub slug: String,
    /// CRM endpoint receiving contacts
    pub webhook_url: String,
    /// Tag attached to every forwarded contact
    pub default_tag: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTenant {
    pub owner_user_id: String,
    pub slug: String,
    pub webhook_url: String,
    pub default_tag: Option<String>,
}

/// One logged contact capture and its delivery outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intake {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Raw payload as captured
    pub payload: serde_json::Value,
    pub duration_sec: Option<i32>,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to log an intake.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIntake {
    pub tenant_id: Uuid,
    pub payload: serde_json::Value,
    pub duration_sec: Option<i32>,
    pub status: DeliveryStatus,
}

/// Errors raised by a [`Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("slug is already taken")]
    SlugTaken,

    #[error("owner already has a tenant")]
    OwnerHasTenant,

    #[error("tenant {0} does not exist")]
    UnknownTenant(Uuid),

    #[error("stored row is invalid: {0}")]
    InvalidRow(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Datastore operations the request handlers depend on.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError>;

    /// Tenant with `slug`, only if `owner_user_id` owns it.
    async fn find_owned_tenant(
        &self,
        owner_user_id: &str,
        slug: &str,
    ) -> Result<Option<Tenant>, StoreError>;

    async fn find_tenant_by_owner(&self, owner_user_id: &str)
        -> Result<Option<Tenant>, StoreError>;

    async fn create_tenant(&self, tenant: NewTenant) -> Result<Tenant, StoreError>;

    async fn insert_intake(&self, intake: NewIntake) -> Result<Intake, StoreError>;

    /// Most recent intakes for a tenant, newest first.
    async fn recent_intakes(&self, tenant_id: Uuid, limit: i64)
        -> Result<Vec<Intake>, StoreError>;
}
