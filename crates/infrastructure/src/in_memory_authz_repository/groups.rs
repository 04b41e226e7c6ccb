use async_trait::async_trait;
use uuid::Uuid;

use authgraph_application::{GroupListQuery, GroupPage, GroupRepository};
use authgraph_core::{AppError, AppResult, TenantId};
use authgraph_domain::{BindingKind, Group, GroupBinding, Role};

use super::{AuthzState, InMemoryAuthzRepository};

impl AuthzState {
    fn role_is_bound(&self, tenant_id: TenantId, role: &Role) -> bool {
        self.group_bindings.iter().any(|binding| {
            binding.tenant_id == tenant_id
                && binding.kind == BindingKind::Role
                && binding.target_id == role.id()
        })
    }
}

#[async_trait]
impl GroupRepository for InMemoryAuthzRepository {
    async fn insert_group(&self, group: Group) -> AppResult<()> {
        self.state.write().await.groups.push(group);
        Ok(())
    }

    async fn find_group(&self, tenant_id: TenantId, group_id: Uuid) -> AppResult<Option<Group>> {
        Ok(self
            .state
            .read()
            .await
            .groups
            .iter()
            .find(|group| group.tenant_id() == tenant_id && group.id() == group_id)
            .cloned())
    }

    async fn update_group(&self, group: Group) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(stored) = state
            .groups
            .iter_mut()
            .find(|stored| stored.tenant_id() == group.tenant_id() && stored.id() == group.id())
        {
            *stored = group;
        }
        Ok(())
    }

    async fn list_groups(
        &self,
        tenant_id: TenantId,
        query: GroupListQuery,
    ) -> AppResult<GroupPage> {
        let state = self.state.read().await;

        let keyword = query.keyword.map(|keyword| keyword.to_lowercase());
        let mut matched: Vec<Group> = state
            .groups
            .iter()
            .filter(|group| group.tenant_id() == tenant_id)
            .filter(|group| {
                keyword.as_deref().is_none_or(|keyword| {
                    group.name().as_str().to_lowercase().contains(keyword)
                        || group.agency_name().as_str().to_lowercase().contains(keyword)
                })
            })
            .cloned()
            .collect();
        matched.sort_by(|left, right| right.created_at().cmp(&left.created_at()));

        let offset = (query.page.saturating_sub(1) as usize) * query.limit as usize;
        let has_more = matched.len() > offset + query.limit as usize;
        let groups = matched
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(GroupPage { groups, has_more })
    }

    async fn list_bindings_for_group(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
    ) -> AppResult<Vec<GroupBinding>> {
        Ok(self
            .state
            .read()
            .await
            .group_bindings
            .iter()
            .filter(|binding| binding.tenant_id == tenant_id && binding.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn list_target_ids(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state
            .read()
            .await
            .group_bindings
            .iter()
            .filter(|binding| {
                binding.tenant_id == tenant_id
                    && binding.group_id == group_id
                    && binding.kind == kind
            })
            .map(|binding| binding.target_id)
            .collect())
    }

    async fn list_group_ids_for_target(
        &self,
        tenant_id: TenantId,
        target_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state
            .read()
            .await
            .group_bindings
            .iter()
            .filter(|binding| {
                binding.tenant_id == tenant_id
                    && binding.target_id == target_id
                    && binding.kind == kind
            })
            .map(|binding| binding.group_id)
            .collect())
    }

    async fn find_binding_for_target(
        &self,
        tenant_id: TenantId,
        target_id: Uuid,
    ) -> AppResult<Option<GroupBinding>> {
        Ok(self
            .state
            .read()
            .await
            .group_bindings
            .iter()
            .find(|binding| binding.tenant_id == tenant_id && binding.target_id == target_id)
            .cloned())
    }

    async fn count_bindings(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<u64> {
        Ok(self
            .state
            .read()
            .await
            .group_bindings
            .iter()
            .filter(|binding| {
                binding.tenant_id == tenant_id
                    && binding.group_id == group_id
                    && binding.kind == kind
            })
            .count() as u64)
    }

    async fn count_unbound_roles(
        &self,
        tenant_id: TenantId,
        excluded_role_names: &[&str],
    ) -> AppResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .iter()
            .filter(|role| role.tenant_id() == tenant_id)
            .filter(|role| !excluded_role_names.contains(&role.name().as_str()))
            .filter(|role| !state.role_is_bound(tenant_id, role))
            .count() as u64)
    }

    async fn apply_binding_diff(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        kind: BindingKind,
        remove_target_ids: &[Uuid],
        insert: Vec<GroupBinding>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.group_bindings.retain(|binding| {
            !(binding.tenant_id == tenant_id
                && binding.group_id == group_id
                && binding.kind == kind
                && remove_target_ids.contains(&binding.target_id))
        });
        // One group per target tenant-wide, like the unique constraint on
        // the Postgres table.
        for binding in &insert {
            if state.group_bindings.iter().any(|existing| {
                existing.tenant_id == binding.tenant_id
                    && existing.target_id == binding.target_id
            }) {
                return Err(AppError::Conflict(format!(
                    "target '{}' is already bound to a group",
                    binding.target_id
                )));
            }
        }
        state.group_bindings.extend(insert);
        Ok(())
    }

    async fn delete_group_cascade(
        &self,
        tenant_id: TenantId,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> AppResult<()> {
        let mut state = self.state.write().await;

        state
            .groups
            .retain(|group| !(group.tenant_id() == tenant_id && group.id() == group_id));
        state
            .group_bindings
            .retain(|binding| !(binding.tenant_id == tenant_id && binding.group_id == group_id));
        state
            .roles
            .retain(|role| !(role.tenant_id() == tenant_id && role_ids.contains(&role.id())));
        state.role_permission_joins.retain(|join| {
            !(join.tenant_id == tenant_id && role_ids.contains(&join.role_id))
        });

        Ok(())
    }
}
