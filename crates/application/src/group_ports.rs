use async_trait::async_trait;
use uuid::Uuid;

use authgraph_core::{AppResult, TenantId};
use authgraph_domain::{BindingKind, Group, GroupBinding};

/// Input payload for creating a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGroupInput {
    /// Group name, 1–50 characters.
    pub name: String,
    /// Agency name, 1–50 characters.
    pub agency_name: String,
    /// Free-form description.
    pub description: String,
}

/// Input payload for updating a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateGroupInput {
    /// Group name, 1–50 characters.
    pub name: String,
    /// Agency name, 1–50 characters.
    pub agency_name: String,
    /// Free-form description.
    pub description: String,
}

/// Query parameters for keyword-paginated group listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupListQuery {
    /// Optional keyword matched against name and agency name.
    pub keyword: Option<String>,
    /// One-based page number.
    pub page: u32,
    /// Maximum rows per page.
    pub limit: u32,
}

impl Default for GroupListQuery {
    fn default() -> Self {
        Self {
            keyword: None,
            page: 1,
            limit: 20,
        }
    }
}

/// One page of groups, newest first.
///
/// Zero matches yield an empty page with `has_more == false` rather than an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPage {
    /// Groups on this page.
    pub groups: Vec<Group>,
    /// Whether further pages exist.
    pub has_more: bool,
}

/// Repository port for groups and their bindings.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Persists a new group.
    async fn insert_group(&self, group: Group) -> AppResult<()>;

    /// Finds a group by id within the tenant.
    async fn find_group(&self, tenant_id: TenantId, group_id: Uuid) -> AppResult<Option<Group>>;

    /// Persists edited group fields.
    async fn update_group(&self, group: Group) -> AppResult<()>;

    /// Lists groups newest first with optional keyword filtering.
    async fn list_groups(&self, tenant_id: TenantId, query: GroupListQuery)
    -> AppResult<GroupPage>;

    /// Lists every binding owned by a group, insertion order.
    async fn list_bindings_for_group(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
    ) -> AppResult<Vec<GroupBinding>>;

    /// Lists target ids bound to a group for one kind, insertion order.
    async fn list_target_ids(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<Vec<Uuid>>;

    /// Lists group ids a target is bound to for one kind, insertion order.
    async fn list_group_ids_for_target(
        &self,
        tenant_id: TenantId,
        target_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<Vec<Uuid>>;

    /// Finds any binding for a target across all groups in the tenant.
    ///
    /// This is the exclusivity probe: attach skips targets that already hold
    /// a binding anywhere.
    async fn find_binding_for_target(
        &self,
        tenant_id: TenantId,
        target_id: Uuid,
    ) -> AppResult<Option<GroupBinding>>;

    /// Counts bindings of one kind owned by a group.
    async fn count_bindings(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<u64>;

    /// Counts roles with no group binding, excluding the given role names.
    async fn count_unbound_roles(
        &self,
        tenant_id: TenantId,
        excluded_role_names: &[&str],
    ) -> AppResult<u64>;

    /// Applies a computed binding diff as one atomic unit.
    ///
    /// Removals match (group, kind, target); insertions are pre-built rows.
    async fn apply_binding_diff(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        kind: BindingKind,
        remove_target_ids: &[Uuid],
        insert: Vec<GroupBinding>,
    ) -> AppResult<()>;

    /// Deletes a group, its bindings, the given roles and their permission
    /// joins as one atomic unit.
    ///
    /// `role_ids` are the targets of the group's bindings of kind `role`,
    /// collected by the caller before deletion.
    async fn delete_group_cascade(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> AppResult<()>;
}
