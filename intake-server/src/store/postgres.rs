//! Postgres-backed [`Store`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use super::{Intake, NewIntake, NewTenant, Store, StoreError, Tenant};

const SLUG_CONSTRAINT: &str = "tenants_slug_key";
const OWNER_CONSTRAINT: &str = "tenants_owner_user_id_key";

#[derive(FromRow)]
struct IntakeRow {
    id: Uuid,
    tenant_id: Uuid,
    payload: serde_json::Value,
    duration_sec: Option<i32>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<IntakeRow> for Intake {
    type Error = StoreError;

    fn try_from(row: IntakeRow) -> Result<Self, Self::Error> {
        Ok(Intake {
            id: row.id,
            tenant_id: row.tenant_id,
            payload: row.payload,
            duration_sec: row.duration_sec,
            status: row.status.parse().map_err(StoreError::InvalidRow)?,
            created_at: row.created_at,
        })
    }
}

/// Postgres [`Store`] over a connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections = max_connections, "database_pool_connected");
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database_migrations_applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Map constraint violations on insert to domain errors.
fn map_insert_error(err: sqlx::Error, tenant_id: Option<Uuid>) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some(SLUG_CONSTRAINT) => StoreError::SlugTaken,
                Some(OWNER_CONSTRAINT) => StoreError::OwnerHasTenant,
                _ => StoreError::Database(err),
            };
        }
        if db.is_foreign_key_violation() {
            if let Some(id) = tenant_id {
                return StoreError::UnknownTenant(id);
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn find_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, owner_user_id, slug, webhook_url, default_tag, created_at
            FROM tenants
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn find_owned_tenant(
        &self,
        owner_user_id: &str,
        slug: &str,
    ) -> Result<Option<Tenant>, StoreError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, owner_user_id, slug, webhook_url, default_tag, created_at
            FROM tenants
            WHERE slug = $1 AND owner_user_id = $2
            "#,
        )
        .bind(slug)
        .bind(owner_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn find_tenant_by_owner(
        &self,
        owner_user_id: &str,
    ) -> Result<Option<Tenant>, StoreError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, owner_user_id, slug, webhook_url, default_tag, created_at
            FROM tenants
            WHERE owner_user_id = $1
            "#,
        )
        .bind(owner_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn create_tenant(&self, tenant: NewTenant) -> Result<Tenant, StoreError> {
        sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (id, owner_user_id, slug, webhook_url, default_tag, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, owner_user_id, slug, webhook_url, default_tag, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&tenant.owner_user_id)
        .bind(&tenant.slug)
        .bind(&tenant.webhook_url)
        .bind(&tenant.default_tag)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, None))
    }

    async fn insert_intake(&self, intake: NewIntake) -> Result<Intake, StoreError> {
        let row = sqlx::query_as::<_, IntakeRow>(
            r#"
            INSERT INTO intakes (id, tenant_id, payload, duration_sec, status, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, tenant_id, payload, duration_sec, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(intake.tenant_id)
        .bind(&intake.payload)
        .bind(intake.duration_sec)
        .bind(intake.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, Some(intake.tenant_id)))?;

        row.try_into()
    }

    async fn recent_intakes(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Intake>, StoreError> {
        let rows = sqlx::query_as::<_, IntakeRow>(
            r#"
            SELECT id, tenant_id, payload, duration_sec, status, created_at
            FROM intakes
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Intake::try_from).collect()
    }
}
