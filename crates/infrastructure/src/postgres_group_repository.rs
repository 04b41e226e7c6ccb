use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use authgraph_application::{GroupListQuery, GroupPage, GroupRepository};
use authgraph_core::{AppError, AppResult, EntityName, TenantId};
use authgraph_domain::{BindingKind, Group, GroupBinding};


/// PostgreSQL-backed repository for groups and group bindings.
#[derive(Clone)]
pub struct PostgresGroupRepository {
    pool: PgPool,
}

impl PostgresGroupRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct GroupRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    agency_name: String,
    description: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_group(self) -> AppResult<Group> {
        let name = EntityName::new(self.name).map_err(|error| {
            AppError::Internal(format!("persisted group name is invalid: {error}"))
        })?;
        let agency_name = EntityName::new(self.agency_name).map_err(|error| {
            AppError::Internal(format!("persisted agency name is invalid: {error}"))
        })?;

        Ok(Group::from_storage(
            self.id,
            TenantId::from_uuid(self.tenant_id),
            name,
            agency_name,
            self.description,
            self.created_by,
            self.created_at,
        ))
    }
}

#[derive(Debug, FromRow)]
struct BindingRow {
    id: Uuid,
    tenant_id: Uuid,
    group_id: Uuid,
    target_id: Uuid,
    kind: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl BindingRow {
    fn into_binding(self) -> AppResult<GroupBinding> {
        let kind = BindingKind::from_str(self.kind.as_str()).map_err(|error| {
            AppError::Internal(format!("persisted binding kind is invalid: {error}"))
        })?;

        Ok(GroupBinding {
            id: self.id,
            tenant_id: TenantId::from_uuid(self.tenant_id),
            group_id: self.group_id,
            target_id: self.target_id,
            kind,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl GroupRepository for PostgresGroupRepository {
    async fn insert_group(&self, group: Group) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO authz_groups (id, tenant_id, name, agency_name, description, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(group.id())
        .bind(group.tenant_id().as_uuid())
        .bind(group.name().as_str())
        .bind(group.agency_name().as_str())
        .bind(group.description())
        .bind(group.created_by())
        .bind(group.created_at())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert group: {error}")))?;

        Ok(())
    }

    async fn find_group(&self, tenant_id: TenantId, group_id: Uuid) -> AppResult<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, tenant_id, name, agency_name, description, created_by, created_at
            FROM authz_groups
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load group: {error}")))?;

        row.map(GroupRow::into_group).transpose()
    }

    async fn update_group(&self, group: Group) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE authz_groups
            SET name = $3, agency_name = $4, description = $5
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(group.tenant_id().as_uuid())
        .bind(group.id())
        .bind(group.name().as_str())
        .bind(group.agency_name().as_str())
        .bind(group.description())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update group: {error}")))?;

        Ok(())
    }

    async fn list_groups(
        &self,
        tenant_id: TenantId,
        query: GroupListQuery,
    ) -> AppResult<GroupPage> {
        let limit = i64::from(query.limit);
        let offset = i64::from(query.page.saturating_sub(1)) * limit;
        let pattern = query.keyword.map(|keyword| format!("%{keyword}%"));

        // Fetch one extra row to learn whether further pages exist.
        let rows = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, tenant_id, name, agency_name, description, created_by, created_at
            FROM authz_groups
            WHERE tenant_id = $1
                AND ($2::text IS NULL OR name ILIKE $2 OR agency_name ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(pattern)
        .bind(limit + 1)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list groups: {error}")))?;

        let has_more = rows.len() as i64 > limit;
        let groups = rows
            .into_iter()
            .take(limit as usize)
            .map(GroupRow::into_group)
            .collect::<AppResult<Vec<Group>>>()?;

        Ok(GroupPage { groups, has_more })
    }

    async fn list_bindings_for_group(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
    ) -> AppResult<Vec<GroupBinding>> {
        let rows = sqlx::query_as::<_, BindingRow>(
            r#"
            SELECT id, tenant_id, group_id, target_id, kind, created_by, created_at
            FROM authz_group_bindings
            WHERE tenant_id = $1 AND group_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list group bindings: {error}")))?;

        rows.into_iter().map(BindingRow::into_binding).collect()
    }

    async fn list_target_ids(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT target_id
            FROM authz_group_bindings
            WHERE tenant_id = $1 AND group_id = $2 AND kind = $3
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(group_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list binding targets: {error}")))
    }

    async fn list_group_ids_for_target(
        &self,
        tenant_id: TenantId,
        target_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT group_id
            FROM authz_group_bindings
            WHERE tenant_id = $1 AND target_id = $2 AND kind = $3
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(target_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list groups for target: {error}"))
        })
    }

    async fn find_binding_for_target(
        &self,
        tenant_id: TenantId,
        target_id: Uuid,
    ) -> AppResult<Option<GroupBinding>> {
        let row = sqlx::query_as::<_, BindingRow>(
            r#"
            SELECT id, tenant_id, group_id, target_id, kind, created_by, created_at
            FROM authz_group_bindings
            WHERE tenant_id = $1 AND target_id = $2
            LIMIT 1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to probe binding for target: {error}"))
        })?;

        row.map(BindingRow::into_binding).transpose()
    }

    async fn count_bindings(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM authz_group_bindings
            WHERE tenant_id = $1 AND group_id = $2 AND kind = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(group_id)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count bindings: {error}")))?;

        Ok(count.max(0) as u64)
    }

    async fn count_unbound_roles(
        &self,
        tenant_id: TenantId,
        excluded_role_names: &[&str],
    ) -> AppResult<u64> {
        let excluded: Vec<String> = excluded_role_names
            .iter()
            .map(|name| (*name).to_owned())
            .collect();

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM authz_roles AS roles
            WHERE roles.tenant_id = $1
                AND roles.name <> ALL($2)
                AND NOT EXISTS (
                    SELECT 1
                    FROM authz_group_bindings AS bindings
                    WHERE bindings.tenant_id = roles.tenant_id
                        AND bindings.kind = 'role'
                        AND bindings.target_id = roles.id
                )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(excluded)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count unbound roles: {error}")))?;

        Ok(count.max(0) as u64)
    }

    async fn apply_binding_diff(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        kind: BindingKind,
        remove_target_ids: &[Uuid],
        insert: Vec<GroupBinding>,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start binding diff transaction for group '{group_id}': {error}"
            ))
        })?;

        if !remove_target_ids.is_empty() {
            sqlx::query(
                r#"
                DELETE FROM authz_group_bindings
                WHERE tenant_id = $1 AND group_id = $2 AND kind = $3 AND target_id = ANY($4)
                "#,
            )
            .bind(tenant_id.as_uuid())
            .bind(group_id)
            .bind(kind.as_str())
            .bind(remove_target_ids)
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete bindings: {error}")))?;
        }

        for binding in insert {
            sqlx::query(
                r#"
                INSERT INTO authz_group_bindings (id, tenant_id, group_id, target_id, kind, created_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(binding.id)
            .bind(binding.tenant_id.as_uuid())
            .bind(binding.group_id)
            .bind(binding.target_id)
            .bind(binding.kind.as_str())
            .bind(binding.created_by)
            .bind(binding.created_at)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                if error
                    .as_database_error()
                    .is_some_and(|database_error| database_error.is_unique_violation())
                {
                    AppError::Conflict(format!(
                        "target '{}' is already bound to a group",
                        binding.target_id
                    ))
                } else {
                    AppError::Internal(format!("failed to insert binding: {error}"))
                }
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit binding diff for group '{group_id}': {error}"
            ))
        })
    }

    async fn delete_group_cascade(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start cascade transaction for group '{group_id}': {error}"
            ))
        })?;

        sqlx::query(
            r#"
            DELETE FROM authz_role_permission_joins
            WHERE tenant_id = $1 AND role_id = ANY($2)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete role permission joins: {error}"))
        })?;

        sqlx::query(
            r#"
            DELETE FROM authz_roles
            WHERE tenant_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(role_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete bound roles: {error}")))?;

        sqlx::query(
            r#"
            DELETE FROM authz_group_bindings
            WHERE tenant_id = $1 AND group_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(group_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete group bindings: {error}")))?;

        sqlx::query(
            r#"
            DELETE FROM authz_groups
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(group_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete group: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit cascade for group '{group_id}': {error}"
            ))
        })?;

        tracing::info!(
            tenant_id = %tenant_id,
            group_id = %group_id,
            cascaded_roles = role_ids.len(),
            "deleted group and its bindings"
        );

        Ok(())
    }
}
