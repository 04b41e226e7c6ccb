use async_trait::async_trait;
use uuid::Uuid;

use authgraph_application::{RoleOverview, RoleRepository};
use authgraph_core::{AppResult, TenantId};
use authgraph_domain::{BindingKind, Role, RoleAccountJoin, RolePermissionJoin};

use super::{AuthzState, InMemoryAuthzRepository};

impl AuthzState {
    fn overview_for(&self, tenant_id: TenantId, role: &Role) -> RoleOverview {
        let group_id = self
            .group_bindings
            .iter()
            .find(|binding| {
                binding.tenant_id == tenant_id
                    && binding.kind == BindingKind::Role
                    && binding.target_id == role.id()
            })
            .map(|binding| binding.group_id);
        let user_count = self
            .role_account_joins
            .iter()
            .filter(|join| join.tenant_id == tenant_id && join.role_id == role.id())
            .count() as u64;

        RoleOverview {
            id: role.id(),
            name: role.name().as_str().to_owned(),
            description: role.description().to_owned(),
            group_id,
            user_count,
            created_at: role.created_at(),
        }
    }
}

#[async_trait]
impl RoleRepository for InMemoryAuthzRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        self.state.write().await.roles.push(role);
        Ok(())
    }

    async fn find_role(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .read()
            .await
            .roles
            .iter()
            .find(|role| role.tenant_id() == tenant_id && role.id() == role_id)
            .cloned())
    }

    async fn update_role(&self, role: Role) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(stored) = state
            .roles
            .iter_mut()
            .find(|stored| stored.tenant_id() == role.tenant_id() && stored.id() == role.id())
        {
            *stored = role;
        }
        Ok(())
    }

    async fn list_overviews(
        &self,
        tenant_id: TenantId,
        keyword: Option<&str>,
    ) -> AppResult<Vec<RoleOverview>> {
        let state = self.state.read().await;
        let keyword = keyword.map(str::to_lowercase);
        Ok(state
            .roles
            .iter()
            .filter(|role| role.tenant_id() == tenant_id)
            .filter(|role| {
                keyword
                    .as_deref()
                    .is_none_or(|keyword| role.name().as_str().to_lowercase().contains(keyword))
            })
            .map(|role| state.overview_for(tenant_id, role))
            .collect())
    }

    async fn find_overview(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<Option<RoleOverview>> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .iter()
            .find(|role| role.tenant_id() == tenant_id && role.id() == role_id)
            .map(|role| state.overview_for(tenant_id, role)))
    }

    async fn delete_role_with_permission_joins(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .roles
            .retain(|role| !(role.tenant_id() == tenant_id && role.id() == role_id));
        state
            .role_permission_joins
            .retain(|join| !(join.tenant_id == tenant_id && join.role_id == role_id));
        Ok(())
    }

    async fn list_permission_ids(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state
            .read()
            .await
            .role_permission_joins
            .iter()
            .filter(|join| join.tenant_id == tenant_id && join.role_id == role_id)
            .map(|join| join.permission_id)
            .collect())
    }

    async fn apply_permission_diff(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
        remove_permission_ids: &[Uuid],
        insert: Vec<RolePermissionJoin>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role_permission_joins.retain(|join| {
            !(join.tenant_id == tenant_id
                && join.role_id == role_id
                && remove_permission_ids.contains(&join.permission_id))
        });
        state.role_permission_joins.extend(insert);
        Ok(())
    }

    async fn find_account_join(
        &self,
        tenant_id: TenantId,
        account_id: Uuid,
    ) -> AppResult<Option<RoleAccountJoin>> {
        Ok(self
            .state
            .read()
            .await
            .role_account_joins
            .iter()
            .find(|join| join.tenant_id == tenant_id && join.account_id == account_id)
            .cloned())
    }

    async fn insert_account_join(&self, join: RoleAccountJoin) -> AppResult<()> {
        self.state.write().await.role_account_joins.push(join);
        Ok(())
    }

    async fn reassign_account_join(
        &self,
        tenant_id: TenantId,
        account_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(join) = state
            .role_account_joins
            .iter_mut()
            .find(|join| join.tenant_id == tenant_id && join.account_id == account_id)
        {
            join.role_id = role_id;
        }
        Ok(())
    }

    async fn delete_account_join(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
        account_id: Uuid,
    ) -> AppResult<()> {
        self.state.write().await.role_account_joins.retain(|join| {
            !(join.tenant_id == tenant_id
                && join.role_id == role_id
                && join.account_id == account_id)
        });
        Ok(())
    }

    async fn count_account_joins(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<u64> {
        Ok(self
            .state
            .read()
            .await
            .role_account_joins
            .iter()
            .filter(|join| join.tenant_id == tenant_id && join.role_id == role_id)
            .count() as u64)
    }
}
