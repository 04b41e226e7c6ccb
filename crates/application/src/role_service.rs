use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use authgraph_core::{Actor, AppError, AppResult};
use authgraph_domain::{
    Role, RoleAccountJoin, RolePermissionJoin, group_visibility_rank, replace_diff,
};

use crate::catalog_ports::CatalogRepository;
use crate::directory::TargetDirectory;
use crate::role_ports::{CreateRoleInput, RoleOverview, RoleRepository, UpdateRoleInput};

/// Application service for roles, permission grants and account assignment.
#[derive(Clone)]
pub struct RoleService {
    repository: Arc<dyn RoleRepository>,
    catalog: Arc<dyn CatalogRepository>,
    directory: Arc<dyn TargetDirectory>,
}

impl RoleService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RoleRepository>,
        catalog: Arc<dyn CatalogRepository>,
        directory: Arc<dyn TargetDirectory>,
    ) -> Self {
        Self {
            repository,
            catalog,
            directory,
        }
    }

    /// Creates a role in the actor's tenant.
    pub async fn create_role(&self, actor: &Actor, input: CreateRoleInput) -> AppResult<Role> {
        let role = Role::create(actor, input.name, input.description)?;
        self.repository.insert_role(role.clone()).await?;
        Ok(role)
    }

    /// Returns a role overview or a not-found error.
    pub async fn view_role(&self, actor: &Actor, role_id: Uuid) -> AppResult<RoleOverview> {
        self.repository
            .find_overview(actor.tenant_id(), role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' not found")))
    }

    /// Updates the editable fields of a role.
    pub async fn update_role(
        &self,
        actor: &Actor,
        role_id: Uuid,
        input: UpdateRoleInput,
    ) -> AppResult<Role> {
        let mut role = self.find_role(actor, role_id).await?;
        role.apply_update(input.name, input.description)?;
        self.repository.update_role(role.clone()).await?;
        Ok(role)
    }

    /// Deletes a role together with its permission joins.
    ///
    /// Account joins referencing the role are deliberately left in place.
    pub async fn delete_role(&self, actor: &Actor, role_id: Uuid) -> AppResult<()> {
        let role = self.find_role(actor, role_id).await?;
        self.repository
            .delete_role_with_permission_joins(actor.tenant_id(), role.id())
            .await
    }

    /// Lists role overviews ordered by group visibility.
    ///
    /// Unbound roles come first, then roles bound to the requested group,
    /// then the rest, each band oldest first. When `group_id` is given,
    /// roles bound to other groups are dropped entirely.
    pub async fn list_roles(
        &self,
        actor: &Actor,
        group_id: Option<Uuid>,
        keyword: Option<&str>,
    ) -> AppResult<Vec<RoleOverview>> {
        let mut overviews = self
            .repository
            .list_overviews(actor.tenant_id(), keyword)
            .await?;

        if group_id.is_some() {
            overviews
                .retain(|overview| group_visibility_rank(overview.group_id, group_id) <= 1);
        }
        overviews.sort_by_key(|overview| {
            (
                group_visibility_rank(overview.group_id, group_id),
                overview.created_at,
            )
        });

        Ok(overviews)
    }

    /// Grants permissions to a role, skipping grants already in place.
    ///
    /// Every permission id must exist in the catalog; the first unknown id
    /// aborts the batch before anything is written.
    pub async fn grant_permissions(
        &self,
        actor: &Actor,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<()> {
        let role = self.find_role(actor, role_id).await?;
        self.ensure_permissions_exist(permission_ids).await?;

        let current: HashSet<Uuid> = self
            .repository
            .list_permission_ids(actor.tenant_id(), role.id())
            .await?
            .into_iter()
            .collect();

        let mut seen = HashSet::new();
        let insert: Vec<RolePermissionJoin> = permission_ids
            .iter()
            .filter(|id| seen.insert(**id) && !current.contains(id))
            .map(|id| RolePermissionJoin::new(actor, role.id(), *id))
            .collect();
        if insert.is_empty() {
            return Ok(());
        }

        self.repository
            .apply_permission_diff(actor.tenant_id(), role.id(), &[], insert)
            .await
    }

    /// Revokes permissions from a role. Absent grants are a no-op.
    ///
    /// Every permission id must exist in the catalog; the first unknown id
    /// aborts the batch before anything is removed.
    pub async fn revoke_permissions(
        &self,
        actor: &Actor,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<()> {
        let role = self.find_role(actor, role_id).await?;
        self.ensure_permissions_exist(permission_ids).await?;

        if permission_ids.is_empty() {
            return Ok(());
        }

        self.repository
            .apply_permission_diff(actor.tenant_id(), role.id(), permission_ids, Vec::new())
            .await
    }

    /// Replaces the role's whole permission set with the requested one.
    ///
    /// The diff against the current set is computed once and applied as one
    /// atomic unit; unchanged grants are untouched.
    pub async fn replace_permissions(
        &self,
        actor: &Actor,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<()> {
        let role = self.find_role(actor, role_id).await?;
        self.ensure_permissions_exist(permission_ids).await?;

        let current = self
            .repository
            .list_permission_ids(actor.tenant_id(), role.id())
            .await?;
        let diff = replace_diff(&current, permission_ids);
        if diff.is_empty() {
            return Ok(());
        }

        let insert = diff
            .to_add
            .iter()
            .map(|id| RolePermissionJoin::new(actor, role.id(), *id))
            .collect();

        self.repository
            .apply_permission_diff(actor.tenant_id(), role.id(), &diff.to_remove, insert)
            .await
    }

    /// Replaces the role's permissions within one module only.
    ///
    /// Requested ids must belong to the module; grants in other modules are
    /// never touched.
    pub async fn replace_module_permissions(
        &self,
        actor: &Actor,
        role_id: Uuid,
        module_id: Uuid,
        permission_ids: &[Uuid],
    ) -> AppResult<()> {
        let role = self.find_role(actor, role_id).await?;

        if !self.catalog.module_exists(module_id).await? {
            return Err(AppError::NotFound(format!(
                "module '{module_id}' not found"
            )));
        }

        let module_set: HashSet<Uuid> = self
            .catalog
            .list_permission_ids_for_module(module_id)
            .await?
            .into_iter()
            .collect();
        for permission_id in permission_ids {
            if !module_set.contains(permission_id) {
                return Err(AppError::Validation(format!(
                    "permission '{permission_id}' does not belong to module '{module_id}'"
                )));
            }
        }

        let current_in_module: Vec<Uuid> = self
            .repository
            .list_permission_ids(actor.tenant_id(), role.id())
            .await?
            .into_iter()
            .filter(|id| module_set.contains(id))
            .collect();
        let diff = replace_diff(&current_in_module, permission_ids);
        if diff.is_empty() {
            return Ok(());
        }

        let insert = diff
            .to_add
            .iter()
            .map(|id| RolePermissionJoin::new(actor, role.id(), *id))
            .collect();

        self.repository
            .apply_permission_diff(actor.tenant_id(), role.id(), &diff.to_remove, insert)
            .await
    }

    /// Lists the ids of permissions granted to a role.
    pub async fn permission_ids(&self, actor: &Actor, role_id: Uuid) -> AppResult<Vec<Uuid>> {
        let role = self.find_role(actor, role_id).await?;
        self.repository
            .list_permission_ids(actor.tenant_id(), role.id())
            .await
    }

    /// Assigns accounts to a role.
    ///
    /// Every account must exist; the first unknown account aborts the batch
    /// before anything is written. Accounts already holding a role join in
    /// the tenant are skipped, keeping the join one-per-account.
    pub async fn assign_accounts(
        &self,
        actor: &Actor,
        role_id: Uuid,
        account_ids: &[Uuid],
    ) -> AppResult<()> {
        let role = self.find_role(actor, role_id).await?;
        self.ensure_accounts_exist(account_ids).await?;

        let mut seen = HashSet::new();
        for account_id in account_ids {
            if !seen.insert(*account_id) {
                continue;
            }

            let existing = self
                .repository
                .find_account_join(actor.tenant_id(), *account_id)
                .await?;
            if existing.is_some() {
                continue;
            }

            self.repository
                .insert_account_join(RoleAccountJoin::new(actor, role.id(), *account_id))
                .await?;
        }

        Ok(())
    }

    /// Assigns accounts to a role, moving any existing join in place.
    ///
    /// Unlike [`assign_accounts`](Self::assign_accounts) an account already
    /// holding a join is reassigned to this role rather than skipped.
    pub async fn reassign_accounts(
        &self,
        actor: &Actor,
        role_id: Uuid,
        account_ids: &[Uuid],
    ) -> AppResult<()> {
        let role = self.find_role(actor, role_id).await?;
        self.ensure_accounts_exist(account_ids).await?;

        let mut seen = HashSet::new();
        for account_id in account_ids {
            if !seen.insert(*account_id) {
                continue;
            }

            let existing = self
                .repository
                .find_account_join(actor.tenant_id(), *account_id)
                .await?;
            match existing {
                Some(join) if join.role_id == role.id() => {}
                Some(_) => {
                    self.repository
                        .reassign_account_join(actor.tenant_id(), *account_id, role.id())
                        .await?;
                }
                None => {
                    self.repository
                        .insert_account_join(RoleAccountJoin::new(actor, role.id(), *account_id))
                        .await?;
                }
            }
        }

        Ok(())
    }

    /// Removes accounts from a role.
    ///
    /// Every account must exist; the first unknown account aborts the batch
    /// before anything is removed. A known account without a join is a no-op.
    pub async fn unassign_accounts(
        &self,
        actor: &Actor,
        role_id: Uuid,
        account_ids: &[Uuid],
    ) -> AppResult<()> {
        let role = self.find_role(actor, role_id).await?;
        self.ensure_accounts_exist(account_ids).await?;

        for account_id in account_ids {
            self.repository
                .delete_account_join(actor.tenant_id(), role.id(), *account_id)
                .await?;
        }

        Ok(())
    }

    /// Counts accounts assigned to a role.
    pub async fn account_count(&self, actor: &Actor, role_id: Uuid) -> AppResult<u64> {
        self.repository
            .count_account_joins(actor.tenant_id(), role_id)
            .await
    }

    async fn find_role(&self, actor: &Actor, role_id: Uuid) -> AppResult<Role> {
        self.repository
            .find_role(actor.tenant_id(), role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' not found")))
    }

    async fn ensure_permissions_exist(&self, permission_ids: &[Uuid]) -> AppResult<()> {
        for permission_id in permission_ids {
            if !self.catalog.permission_exists(*permission_id).await? {
                return Err(AppError::NotFound(format!(
                    "permission '{permission_id}' not found"
                )));
            }
        }
        Ok(())
    }

    async fn ensure_accounts_exist(&self, account_ids: &[Uuid]) -> AppResult<()> {
        for account_id in account_ids {
            if !self.directory.account_exists(*account_id).await? {
                return Err(AppError::NotFound(format!(
                    "account '{account_id}' not found"
                )));
            }
        }
        Ok(())
    }
}
