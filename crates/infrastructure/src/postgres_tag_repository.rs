use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use authgraph_application::{TagOverview, TagRepository};
use authgraph_core::{AppError, AppResult, EntityName, TenantId};
use authgraph_domain::{Tag, TagBinding, TagTargetKind};

/// PostgreSQL-backed repository for tags and tag bindings.
#[derive(Clone)]
pub struct PostgresTagRepository {
    pool: PgPool,
}

impl PostgresTagRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TagRow {
    id: Uuid,
    tenant_id: Uuid,
    kind: String,
    name: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TagRow {
    fn into_tag(self) -> AppResult<Tag> {
        let kind = TagTargetKind::from_str(self.kind.as_str()).map_err(|error| {
            AppError::Internal(format!("persisted tag kind is invalid: {error}"))
        })?;
        let name = EntityName::new(self.name).map_err(|error| {
            AppError::Internal(format!("persisted tag name is invalid: {error}"))
        })?;

        Ok(Tag::from_storage(
            self.id,
            TenantId::from_uuid(self.tenant_id),
            kind,
            name,
            self.created_by,
            self.created_at,
        ))
    }
}

#[derive(Debug, FromRow)]
struct TagOverviewRow {
    id: Uuid,
    kind: String,
    name: String,
    binding_count: i64,
}

#[derive(Debug, FromRow)]
struct TagBindingRow {
    id: Uuid,
    tenant_id: Uuid,
    tag_id: Uuid,
    target_id: Uuid,
    kind: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TagBindingRow {
    fn into_binding(self) -> AppResult<TagBinding> {
        let kind = TagTargetKind::from_str(self.kind.as_str()).map_err(|error| {
            AppError::Internal(format!("persisted tag binding kind is invalid: {error}"))
        })?;

        Ok(TagBinding {
            id: self.id,
            tenant_id: TenantId::from_uuid(self.tenant_id),
            tag_id: self.tag_id,
            target_id: self.target_id,
            kind,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn insert_tag(&self, tag: Tag) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO authz_tags (id, tenant_id, kind, name, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tag.id())
        .bind(tag.tenant_id().as_uuid())
        .bind(tag.kind().as_str())
        .bind(tag.name().as_str())
        .bind(tag.created_by())
        .bind(tag.created_at())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert tag: {error}")))?;

        Ok(())
    }

    async fn find_tag(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT id, tenant_id, kind, name, created_by, created_at
            FROM authz_tags
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(tag_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load tag: {error}")))?;

        row.map(TagRow::into_tag).transpose()
    }

    async fn update_tag(&self, tag: Tag) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE authz_tags
            SET name = $3
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tag.tenant_id().as_uuid())
        .bind(tag.id())
        .bind(tag.name().as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update tag: {error}")))?;

        Ok(())
    }

    async fn find_tag_by_name(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        name: &str,
    ) -> AppResult<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT id, tenant_id, kind, name, created_by, created_at
            FROM authz_tags
            WHERE tenant_id = $1 AND kind = $2 AND LOWER(name) = LOWER($3)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(kind.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load tag by name: {error}")))?;

        row.map(TagRow::into_tag).transpose()
    }

    async fn list_overviews(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        keyword: Option<&str>,
    ) -> AppResult<Vec<TagOverview>> {
        let pattern = keyword.map(|keyword| format!("%{keyword}%"));

        let rows = sqlx::query_as::<_, TagOverviewRow>(
            r#"
            SELECT
                tags.id,
                tags.kind,
                tags.name,
                COUNT(bindings.id) AS binding_count
            FROM authz_tags AS tags
            LEFT JOIN authz_tag_bindings AS bindings
                ON bindings.tenant_id = tags.tenant_id
                AND bindings.tag_id = tags.id
            WHERE tags.tenant_id = $1
                AND tags.kind = $2
                AND ($3::text IS NULL OR tags.name ILIKE $3)
            GROUP BY tags.id, tags.kind, tags.name
            ORDER BY tags.name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(kind.as_str())
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list tags: {error}")))?;

        rows.into_iter()
            .map(|row| {
                let kind = TagTargetKind::from_str(row.kind.as_str()).map_err(|error| {
                    AppError::Internal(format!("persisted tag kind is invalid: {error}"))
                })?;
                Ok(TagOverview {
                    id: row.id,
                    kind,
                    name: row.name,
                    binding_count: row.binding_count.max(0) as u64,
                })
            })
            .collect()
    }

    async fn delete_tag_with_bindings(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start delete transaction for tag '{tag_id}': {error}"
            ))
        })?;

        sqlx::query(
            r#"
            DELETE FROM authz_tag_bindings
            WHERE tenant_id = $1 AND tag_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(tag_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete tag bindings: {error}")))?;

        sqlx::query(
            r#"
            DELETE FROM authz_tags
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(tag_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete tag: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit delete for tag '{tag_id}': {error}"
            ))
        })?;

        tracing::info!(
            tenant_id = %tenant_id,
            tag_id = %tag_id,
            "deleted tag and its bindings"
        );

        Ok(())
    }

    async fn count_bindings(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM authz_tag_bindings
            WHERE tenant_id = $1 AND tag_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(tag_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count tag bindings: {error}")))?;

        Ok(count.max(0) as u64)
    }

    async fn find_tag_binding(
        &self,
        tenant_id: TenantId,
        tag_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<Option<TagBinding>> {
        let row = sqlx::query_as::<_, TagBindingRow>(
            r#"
            SELECT id, tenant_id, tag_id, target_id, kind, created_by, created_at
            FROM authz_tag_bindings
            WHERE tenant_id = $1 AND tag_id = $2 AND target_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(tag_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load tag binding: {error}")))?;

        row.map(TagBindingRow::into_binding).transpose()
    }

    async fn insert_tag_bindings(&self, bindings: Vec<TagBinding>) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start tag binding insert transaction: {error}"
            ))
        })?;

        for binding in bindings {
            sqlx::query(
                r#"
                INSERT INTO authz_tag_bindings (id, tenant_id, tag_id, target_id, kind, created_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(binding.id)
            .bind(binding.tenant_id.as_uuid())
            .bind(binding.tag_id)
            .bind(binding.target_id)
            .bind(binding.kind.as_str())
            .bind(binding.created_by)
            .bind(binding.created_at)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to insert tag binding: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit tag binding insert: {error}"))
        })
    }

    async fn delete_tag_binding(
        &self,
        tenant_id: TenantId,
        tag_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM authz_tag_bindings
            WHERE tenant_id = $1 AND tag_id = $2 AND target_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(tag_id)
        .bind(target_id)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete tag binding: {error}")))?;

        Ok(())
    }

    async fn list_target_ids_for_tags(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        tag_ids: &[Uuid],
    ) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT target_id
            FROM authz_tag_bindings
            WHERE tenant_id = $1 AND kind = $2 AND tag_id = ANY($3)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(kind.as_str())
        .bind(tag_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list targets for tags: {error}"))
        })
    }

    async fn list_tags_for_target(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        target_id: Uuid,
    ) -> AppResult<Vec<Tag>> {
        let rows = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT tags.id, tags.tenant_id, tags.kind, tags.name, tags.created_by, tags.created_at
            FROM authz_tags AS tags
            INNER JOIN authz_tag_bindings AS bindings
                ON bindings.tenant_id = tags.tenant_id
                AND bindings.tag_id = tags.id
            WHERE tags.tenant_id = $1
                AND bindings.kind = $2
                AND bindings.target_id = $3
            ORDER BY tags.name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(kind.as_str())
        .bind(target_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list tags for target: {error}")))?;

        rows.into_iter().map(TagRow::into_tag).collect()
    }
}
