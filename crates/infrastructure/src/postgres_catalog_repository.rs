use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use authgraph_application::CatalogRepository;
use authgraph_core::{AppError, AppResult};
use authgraph_domain::{CatalogPermission, CatalogRow, CatalogSubModule, Module};

/// PostgreSQL-backed repository for the permission catalog.
#[derive(Clone)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ModuleRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct JoinedCatalogRow {
    module_name: String,
    sub_module_name: Option<String>,
    sub_module_description: Option<String>,
    permission_id: Option<Uuid>,
    permission_name: Option<String>,
    is_superadmin_only: Option<bool>,
}

impl JoinedCatalogRow {
    fn into_catalog_row(self) -> CatalogRow {
        let sub_module = self.sub_module_name.map(|name| CatalogSubModule {
            name,
            description: self.sub_module_description.unwrap_or_default(),
        });
        let permission = match (self.permission_id, self.permission_name) {
            (Some(id), Some(name)) => Some(CatalogPermission {
                id,
                name,
                is_superadmin_only: self.is_superadmin_only.unwrap_or(false),
            }),
            _ => None,
        };

        CatalogRow {
            module_name: self.module_name,
            sub_module,
            permission,
        }
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn list_modules(&self) -> AppResult<Vec<Module>> {
        let rows = sqlx::query_as::<_, ModuleRow>(
            r#"
            SELECT id, name, created_at
            FROM authz_modules
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list modules: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|row| Module {
                id: row.id,
                name: row.name,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn module_exists(&self, module_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM authz_modules WHERE id = $1)
            "#,
        )
        .bind(module_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to probe module: {error}")))
    }

    async fn permission_exists(&self, permission_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM authz_permissions WHERE id = $1)
            "#,
        )
        .bind(permission_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to probe permission: {error}")))
    }

    async fn list_permission_ids_for_module(&self, module_id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT permissions.id
            FROM authz_permissions AS permissions
            INNER JOIN authz_sub_modules AS sub_modules
                ON sub_modules.id = permissions.sub_module_id
            WHERE sub_modules.module_id = $1
            "#,
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list module permissions: {error}"))
        })
    }

    async fn list_catalog_rows(&self, module_id: Option<Uuid>) -> AppResult<Vec<CatalogRow>> {
        let rows = sqlx::query_as::<_, JoinedCatalogRow>(
            r#"
            SELECT
                modules.name AS module_name,
                sub_modules.name AS sub_module_name,
                sub_modules.description AS sub_module_description,
                permissions.id AS permission_id,
                permissions.name AS permission_name,
                permissions.is_superadmin_only
            FROM authz_modules AS modules
            LEFT JOIN authz_sub_modules AS sub_modules
                ON sub_modules.module_id = modules.id
            LEFT JOIN authz_permissions AS permissions
                ON permissions.sub_module_id = sub_modules.id
            WHERE $1::uuid IS NULL OR modules.id = $1
            ORDER BY modules.created_at DESC, sub_modules.name, permissions.code
            "#,
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load catalog rows: {error}")))?;

        Ok(rows
            .into_iter()
            .map(JoinedCatalogRow::into_catalog_row)
            .collect())
    }
}
