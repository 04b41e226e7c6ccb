use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use authgraph_application::{RoleOverview, RoleRepository};
use authgraph_core::{AppError, AppResult, EntityName, TenantId};
use authgraph_domain::{Role, RoleAccountJoin, RolePermissionJoin};

/// PostgreSQL-backed repository for roles and their joins.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    description: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        let name = EntityName::new(self.name).map_err(|error| {
            AppError::Internal(format!("persisted role name is invalid: {error}"))
        })?;

        Ok(Role::from_storage(
            self.id,
            TenantId::from_uuid(self.tenant_id),
            name,
            self.description,
            self.created_by,
            self.created_at,
        ))
    }
}

#[derive(Debug, FromRow)]
struct RoleOverviewRow {
    id: Uuid,
    name: String,
    description: String,
    group_id: Option<Uuid>,
    user_count: i64,
    created_at: DateTime<Utc>,
}

impl RoleOverviewRow {
    fn into_overview(self) -> RoleOverview {
        RoleOverview {
            id: self.id,
            name: self.name,
            description: self.description,
            group_id: self.group_id,
            user_count: self.user_count.max(0) as u64,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AccountJoinRow {
    id: Uuid,
    tenant_id: Uuid,
    role_id: Uuid,
    account_id: Uuid,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl AccountJoinRow {
    fn into_join(self) -> RoleAccountJoin {
        RoleAccountJoin {
            id: self.id,
            tenant_id: TenantId::from_uuid(self.tenant_id),
            role_id: self.role_id,
            account_id: self.account_id,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

const OVERVIEW_QUERY: &str = r#"
    SELECT
        roles.id,
        roles.name,
        roles.description,
        bindings.group_id,
        COUNT(account_joins.id) AS user_count,
        roles.created_at
    FROM authz_roles AS roles
    LEFT JOIN authz_group_bindings AS bindings
        ON bindings.tenant_id = roles.tenant_id
        AND bindings.kind = 'role'
        AND bindings.target_id = roles.id
    LEFT JOIN authz_role_account_joins AS account_joins
        ON account_joins.tenant_id = roles.tenant_id
        AND account_joins.role_id = roles.id
    WHERE roles.tenant_id = $1
"#;

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO authz_roles (id, tenant_id, name, description, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.id())
        .bind(role.tenant_id().as_uuid())
        .bind(role.name().as_str())
        .bind(role.description())
        .bind(role.created_by())
        .bind(role.created_at())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert role: {error}")))?;

        Ok(())
    }

    async fn find_role(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, tenant_id, name, description, created_by, created_at
            FROM authz_roles
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role: {error}")))?;

        row.map(RoleRow::into_role).transpose()
    }

    async fn update_role(&self, role: Role) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE authz_roles
            SET name = $3, description = $4
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(role.tenant_id().as_uuid())
        .bind(role.id())
        .bind(role.name().as_str())
        .bind(role.description())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update role: {error}")))?;

        Ok(())
    }

    async fn list_overviews(
        &self,
        tenant_id: TenantId,
        keyword: Option<&str>,
    ) -> AppResult<Vec<RoleOverview>> {
        let pattern = keyword.map(|keyword| format!("%{keyword}%"));
        let query = format!(
            "{OVERVIEW_QUERY}
                AND ($2::text IS NULL OR roles.name ILIKE $2)
            GROUP BY roles.id, roles.name, roles.description, bindings.group_id, roles.created_at"
        );

        let rows = sqlx::query_as::<_, RoleOverviewRow>(query.as_str())
            .bind(tenant_id.as_uuid())
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list role overviews: {error}"))
            })?;

        Ok(rows
            .into_iter()
            .map(RoleOverviewRow::into_overview)
            .collect())
    }

    async fn find_overview(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<Option<RoleOverview>> {
        let query = format!(
            "{OVERVIEW_QUERY}
                AND roles.id = $2
            GROUP BY roles.id, roles.name, roles.description, bindings.group_id, roles.created_at"
        );

        let row = sqlx::query_as::<_, RoleOverviewRow>(query.as_str())
            .bind(tenant_id.as_uuid())
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to load role overview: {error}"))
            })?;

        Ok(row.map(RoleOverviewRow::into_overview))
    }

    async fn delete_role_with_permission_joins(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start delete transaction for role '{role_id}': {error}"
            ))
        })?;

        sqlx::query(
            r#"
            DELETE FROM authz_role_permission_joins
            WHERE tenant_id = $1 AND role_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete role permission joins: {error}"))
        })?;

        // Account joins survive; reassignment later repoints them.
        sqlx::query(
            r#"
            DELETE FROM authz_roles
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit delete for role '{role_id}': {error}"
            ))
        })?;

        tracing::info!(
            tenant_id = %tenant_id,
            role_id = %role_id,
            "deleted role and its permission joins"
        );

        Ok(())
    }

    async fn list_permission_ids(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT permission_id
            FROM authz_role_permission_joins
            WHERE tenant_id = $1 AND role_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role permissions: {error}"))
        })
    }

    async fn apply_permission_diff(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
        remove_permission_ids: &[Uuid],
        insert: Vec<RolePermissionJoin>,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start permission diff transaction for role '{role_id}': {error}"
            ))
        })?;

        if !remove_permission_ids.is_empty() {
            sqlx::query(
                r#"
                DELETE FROM authz_role_permission_joins
                WHERE tenant_id = $1 AND role_id = $2 AND permission_id = ANY($3)
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(role_id)
            .bind(remove_permission_ids)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete permission joins: {error}"))
            })?;
        }

        for join in insert {
            sqlx::query(
                r#"
                INSERT INTO authz_role_permission_joins (id, tenant_id, role_id, permission_id)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(join.id)
            .bind(join.tenant_id.as_uuid())
            .bind(join.role_id)
            .bind(join.permission_id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to insert permission join: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit permission diff for role '{role_id}': {error}"
            ))
        })
    }

    async fn find_account_join(
        &self,
        tenant_id: TenantId,
        account_id: Uuid,
    ) -> AppResult<Option<RoleAccountJoin>> {
        let row = sqlx::query_as::<_, AccountJoinRow>(
            r#"
            SELECT id, tenant_id, role_id, account_id, created_by, created_at
            FROM authz_role_account_joins
            WHERE tenant_id = $1 AND account_id = $2
            LIMIT 1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load account join: {error}")))?;

        Ok(row.map(AccountJoinRow::into_join))
    }

    async fn insert_account_join(&self, join: RoleAccountJoin) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO authz_role_account_joins (id, tenant_id, role_id, account_id, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(join.id)
        .bind(join.tenant_id.as_uuid())
        .bind(join.role_id)
        .bind(join.account_id)
        .bind(join.created_by)
        .bind(join.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert account join: {error}")))?;

        Ok(())
    }

    async fn reassign_account_join(
        &self,
        tenant_id: TenantId,
        account_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE authz_role_account_joins
            SET role_id = $3
            WHERE tenant_id = $1 AND account_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(account_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to reassign account join: {error}"))
        })?;

        Ok(())
    }

    async fn delete_account_join(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
        account_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM authz_role_account_joins
            WHERE tenant_id = $1 AND role_id = $2 AND account_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete account join: {error}")))?;

        Ok(())
    }

    async fn count_account_joins(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM authz_role_account_joins
            WHERE tenant_id = $1 AND role_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count account joins: {error}")))?;

        Ok(count.max(0) as u64)
    }
}
