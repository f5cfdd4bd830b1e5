//! In-process [`Store`] with the same uniqueness rules as the Postgres schema.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Intake, NewIntake, NewTenant, Store, StoreError, Tenant};

#[derive(Default)]
struct MemoryInner {
    tenants: RwLock<Vec<Tenant>>,
    intakes: RwLock<Vec<Intake>>,
    fail_intake_writes: AtomicBool,
}

/// Store kept entirely in memory.
///
/// Clones share the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent intake insert fail, simulating an unavailable
    /// datastore.
    pub fn fail_intake_writes(&self, fail: bool) {
        self.inner.fail_intake_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all logged intakes in insertion order.
    pub async fn intakes(&self) -> Vec<Intake> {
        self.inner.intakes.read().await.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        let tenants = self.inner.tenants.read().await;
        Ok(tenants.iter().find(|t| t.slug == slug).cloned())
    }

    async fn find_owned_tenant(
        &self,
        owner_user_id: &str,
        slug: &str,
    ) -> Result<Option<Tenant>, StoreError> {
        let tenants = self.inner.tenants.read().await;
        Ok(tenants
            .iter()
            .find(|t| t.slug == slug && t.owner_user_id == owner_user_id)
            .cloned())
    }

    async fn find_tenant_by_owner(
        &self,
        owner_user_id: &str,
    ) -> Result<Option<Tenant>, StoreError> {
        let tenants = self.inner.tenants.read().await;
        Ok(tenants
            .iter()
            .find(|t| t.owner_user_id == owner_user_id)
            .cloned())
    }

    async fn create_tenant(&self, tenant: NewTenant) -> Result<Tenant, StoreError> {
        let mut tenants = self.inner.tenants.write().await;

        if tenants.iter().any(|t| t.slug == tenant.slug) {
            return Err(StoreError::SlugTaken);
        }
        if tenants.iter().any(|t| t.owner_user_id == tenant.owner_user_id) {
            return Err(StoreError::OwnerHasTenant);
        }

        let created = Tenant {
            id: Uuid::new_v4(),
            owner_user_id: tenant.owner_user_id,
            slug: tenant.slug,
            webhook_url: tenant.webhook_url,
            default_tag: tenant.default_tag,
            created_at: Utc::now(),
        };
        tenants.push(created.clone());
        Ok(created)
    }

    async fn insert_intake(&self, intake: NewIntake) -> Result<Intake, StoreError> {
        if self.inner.fail_intake_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("intake writes disabled".to_string()));
        }

        let tenant_exists = self
            .inner
            .tenants
            .read()
            .await
            .iter()
            .any(|t| t.id == intake.tenant_id);
        if !tenant_exists {
            return Err(StoreError::UnknownTenant(intake.tenant_id));
        }

        let created = Intake {
            id: Uuid::new_v4(),
            tenant_id: intake.tenant_id,
            payload: intake.payload,
            duration_sec: intake.duration_sec,
            status: intake.status,
            created_at: Utc::now(),
        };
        self.inner.intakes.write().await.push(created.clone());
        Ok(created)
    }

    async fn recent_intakes(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Intake>, StoreError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let intakes = self.inner.intakes.read().await;
        // Insertion order doubles as creation order, so newest is last.
        Ok(intakes
            .iter()
            .rev()
            .filter(|i| i.tenant_id == tenant_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
