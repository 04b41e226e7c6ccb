use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use authgraph_application::TargetDirectory;
use authgraph_core::{AppError, AppResult, TenantId};

/// PostgreSQL-backed existence checks against the collaborating tables.
///
/// Datasets, apps and memberships are owned by other subsystems; this
/// adapter only ever reads them.
#[derive(Clone)]
pub struct PostgresTargetDirectory {
    pool: PgPool,
}

impl PostgresTargetDirectory {
    /// Creates a directory with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TargetDirectory for PostgresTargetDirectory {
    async fn dataset_exists(&self, tenant_id: TenantId, dataset_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM datasets WHERE tenant_id = $1 AND id = $2)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(dataset_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to probe dataset: {error}")))
    }

    async fn app_exists(&self, tenant_id: TenantId, app_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM apps WHERE tenant_id = $1 AND id = $2)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(app_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to probe app: {error}")))
    }

    async fn membership_exists(&self, tenant_id: TenantId, account_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM tenant_account_joins
                WHERE tenant_id = $1 AND account_id = $2
            )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to probe membership: {error}")))
    }

    async fn role_exists(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM authz_roles WHERE tenant_id = $1 AND id = $2)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to probe role: {error}")))
    }

    async fn account_exists(&self, account_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM accounts WHERE id = $1)
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to probe account: {error}")))
    }
}
