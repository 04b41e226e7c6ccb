use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use authgraph_core::{AppResult, TenantId};
use authgraph_domain::{Role, RoleAccountJoin, RolePermissionJoin};

/// Input payload for creating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Role name, 1–50 characters.
    pub name: String,
    /// Free-form description.
    pub description: String,
}

/// Input payload for updating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// Role name, 1–50 characters.
    pub name: String,
    /// Free-form description.
    pub description: String,
}

/// A role decorated with its group binding and assignment count.
///
/// `group_id` is `None` for unbound roles, which are visible tenant-wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOverview {
    /// Stable role identifier.
    pub id: Uuid,
    /// Role display name.
    pub name: String,
    /// Role description.
    pub description: String,
    /// Group the role is bound to, if any.
    pub group_id: Option<Uuid>,
    /// Number of accounts currently assigned to the role.
    pub user_count: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Repository port for roles, their permission joins and account joins.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Persists a new role.
    async fn insert_role(&self, role: Role) -> AppResult<()>;

    /// Finds a role by id within the tenant.
    async fn find_role(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<Option<Role>>;

    /// Persists edited role fields.
    async fn update_role(&self, role: Role) -> AppResult<()>;

    /// Lists role overviews for the tenant with optional keyword filtering
    /// on the role name. Unsorted; the service owns visibility ordering.
    async fn list_overviews(
        &self,
        tenant_id: TenantId,
        keyword: Option<&str>,
    ) -> AppResult<Vec<RoleOverview>>;

    /// Finds one role overview by id within the tenant.
    async fn find_overview(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<Option<RoleOverview>>;

    /// Deletes a role and its permission joins as one atomic unit.
    ///
    /// Account joins referencing the role are left in place.
    async fn delete_role_with_permission_joins(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<()>;

    /// Lists the ids of permissions granted to a role.
    async fn list_permission_ids(&self, tenant_id: TenantId, role_id: Uuid)
    -> AppResult<Vec<Uuid>>;

    /// Applies a computed permission diff for one role as one atomic unit.
    async fn apply_permission_diff(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
        remove_permission_ids: &[Uuid],
        insert: Vec<RolePermissionJoin>,
    ) -> AppResult<()>;

    /// Finds the account's role join in the tenant, if any. Each account
    /// holds at most one.
    async fn find_account_join(
        &self,
        tenant_id: TenantId,
        account_id: Uuid,
    ) -> AppResult<Option<RoleAccountJoin>>;

    /// Persists a new account join.
    async fn insert_account_join(&self, join: RoleAccountJoin) -> AppResult<()>;

    /// Moves the account's existing join to another role in place.
    async fn reassign_account_join(
        &self,
        tenant_id: TenantId,
        account_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<()>;

    /// Deletes one account join; absent rows are a no-op.
    async fn delete_account_join(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
        account_id: Uuid,
    ) -> AppResult<()>;

    /// Counts accounts assigned to a role.
    async fn count_account_joins(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<u64>;
}
