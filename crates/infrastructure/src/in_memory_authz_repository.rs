use std::collections::HashSet;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use authgraph_core::TenantId;
use authgraph_domain::{
    Group, GroupBinding, Module, Permission, Role, RoleAccountJoin, RolePermissionJoin, SubModule,
    Tag, TagBinding,
};

mod catalog;
mod directory;
mod groups;
mod roles;
mod tags;

/// In-memory implementation of every authorization port.
///
/// All tables live behind one lock so cross-table operations (the group
/// cascade, binding diffs) observe and mutate a single consistent state,
/// the way the Postgres adapters use one transaction.
#[derive(Debug, Default)]
pub struct InMemoryAuthzRepository {
    state: RwLock<AuthzState>,
}

#[derive(Debug, Default)]
struct AuthzState {
    groups: Vec<Group>,
    group_bindings: Vec<GroupBinding>,
    roles: Vec<Role>,
    role_permission_joins: Vec<RolePermissionJoin>,
    role_account_joins: Vec<RoleAccountJoin>,
    tags: Vec<Tag>,
    tag_bindings: Vec<TagBinding>,
    modules: Vec<Module>,
    sub_modules: Vec<SubModule>,
    permissions: Vec<Permission>,
    datasets: HashSet<(TenantId, Uuid)>,
    apps: HashSet<(TenantId, Uuid)>,
    memberships: HashSet<(TenantId, Uuid)>,
    accounts: HashSet<Uuid>,
}

impl InMemoryAuthzRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a knowledge dataset owned by a tenant.
    pub async fn seed_dataset(&self, tenant_id: TenantId, dataset_id: Uuid) {
        self.state
            .write()
            .await
            .datasets
            .insert((tenant_id, dataset_id));
    }

    /// Registers an app owned by a tenant.
    pub async fn seed_app(&self, tenant_id: TenantId, app_id: Uuid) {
        self.state.write().await.apps.insert((tenant_id, app_id));
    }

    /// Registers an active tenant-account membership.
    pub async fn seed_membership(&self, tenant_id: TenantId, account_id: Uuid) {
        self.state
            .write()
            .await
            .memberships
            .insert((tenant_id, account_id));
    }

    /// Registers an account.
    pub async fn seed_account(&self, account_id: Uuid) {
        self.state.write().await.accounts.insert(account_id);
    }

    /// Adds a catalog module and returns it.
    pub async fn seed_module(&self, name: &str) -> Module {
        let module = Module {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        self.state.write().await.modules.push(module.clone());
        module
    }

    /// Adds a catalog submodule and returns it.
    pub async fn seed_sub_module(&self, module_id: Uuid, name: &str, description: &str) -> SubModule {
        let sub_module = SubModule {
            id: Uuid::new_v4(),
            module_id,
            name: name.to_owned(),
            description: description.to_owned(),
        };
        self.state.write().await.sub_modules.push(sub_module.clone());
        sub_module
    }

    /// Adds a catalog permission and returns it.
    pub async fn seed_permission(
        &self,
        sub_module_id: Uuid,
        code: &str,
        name: &str,
        is_superadmin_only: bool,
    ) -> Permission {
        let permission = Permission {
            id: Uuid::new_v4(),
            sub_module_id,
            code: code.to_owned(),
            name: name.to_owned(),
            is_superadmin_only,
        };
        self.state.write().await.permissions.push(permission.clone());
        permission
    }
}
