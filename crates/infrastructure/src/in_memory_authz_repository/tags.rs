use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use authgraph_application::{TagOverview, TagRepository};
use authgraph_core::{AppResult, TenantId};
use authgraph_domain::{Tag, TagBinding, TagTargetKind};

use super::InMemoryAuthzRepository;

#[async_trait]
impl TagRepository for InMemoryAuthzRepository {
    async fn insert_tag(&self, tag: Tag) -> AppResult<()> {
        self.state.write().await.tags.push(tag);
        Ok(())
    }

    async fn find_tag(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<Option<Tag>> {
        Ok(self
            .state
            .read()
            .await
            .tags
            .iter()
            .find(|tag| tag.tenant_id() == tenant_id && tag.id() == tag_id)
            .cloned())
    }

    async fn update_tag(&self, tag: Tag) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(stored) = state
            .tags
            .iter_mut()
            .find(|stored| stored.tenant_id() == tag.tenant_id() && stored.id() == tag.id())
        {
            *stored = tag;
        }
        Ok(())
    }

    async fn find_tag_by_name(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        name: &str,
    ) -> AppResult<Option<Tag>> {
        let wanted = name.to_lowercase();
        Ok(self
            .state
            .read()
            .await
            .tags
            .iter()
            .find(|tag| {
                tag.tenant_id() == tenant_id
                    && tag.kind() == kind
                    && tag.name().as_str().to_lowercase() == wanted
            })
            .cloned())
    }

    async fn list_overviews(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        keyword: Option<&str>,
    ) -> AppResult<Vec<TagOverview>> {
        let state = self.state.read().await;
        let keyword = keyword.map(str::to_lowercase);

        let mut overviews: Vec<TagOverview> = state
            .tags
            .iter()
            .filter(|tag| tag.tenant_id() == tenant_id && tag.kind() == kind)
            .filter(|tag| {
                keyword
                    .as_deref()
                    .is_none_or(|keyword| tag.name().as_str().to_lowercase().contains(keyword))
            })
            .map(|tag| TagOverview {
                id: tag.id(),
                kind: tag.kind(),
                name: tag.name().as_str().to_owned(),
                binding_count: state
                    .tag_bindings
                    .iter()
                    .filter(|binding| binding.tag_id == tag.id())
                    .count() as u64,
            })
            .collect();
        overviews.sort_by(|left, right| left.name.cmp(&right.name));

        Ok(overviews)
    }

    async fn delete_tag_with_bindings(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .tags
            .retain(|tag| !(tag.tenant_id() == tenant_id && tag.id() == tag_id));
        state
            .tag_bindings
            .retain(|binding| !(binding.tenant_id == tenant_id && binding.tag_id == tag_id));
        Ok(())
    }

    async fn count_bindings(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<u64> {
        Ok(self
            .state
            .read()
            .await
            .tag_bindings
            .iter()
            .filter(|binding| binding.tenant_id == tenant_id && binding.tag_id == tag_id)
            .count() as u64)
    }

    async fn find_tag_binding(
        &self,
        tenant_id: TenantId,
        tag_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<Option<TagBinding>> {
        Ok(self
            .state
            .read()
            .await
            .tag_bindings
            .iter()
            .find(|binding| {
                binding.tenant_id == tenant_id
                    && binding.tag_id == tag_id
                    && binding.target_id == target_id
            })
            .cloned())
    }

    async fn insert_tag_bindings(&self, bindings: Vec<TagBinding>) -> AppResult<()> {
        self.state.write().await.tag_bindings.extend(bindings);
        Ok(())
    }

    async fn delete_tag_binding(
        &self,
        tenant_id: TenantId,
        tag_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<()> {
        self.state.write().await.tag_bindings.retain(|binding| {
            !(binding.tenant_id == tenant_id
                && binding.tag_id == tag_id
                && binding.target_id == target_id)
        });
        Ok(())
    }

    async fn list_target_ids_for_tags(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        tag_ids: &[Uuid],
    ) -> AppResult<Vec<Uuid>> {
        let mut seen = HashSet::new();
        Ok(self
            .state
            .read()
            .await
            .tag_bindings
            .iter()
            .filter(|binding| {
                binding.tenant_id == tenant_id
                    && binding.kind == kind
                    && tag_ids.contains(&binding.tag_id)
            })
            .filter(|binding| seen.insert(binding.target_id))
            .map(|binding| binding.target_id)
            .collect())
    }

    async fn list_tags_for_target(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        target_id: Uuid,
    ) -> AppResult<Vec<Tag>> {
        let state = self.state.read().await;
        Ok(state
            .tag_bindings
            .iter()
            .filter(|binding| {
                binding.tenant_id == tenant_id
                    && binding.kind == kind
                    && binding.target_id == target_id
            })
            .filter_map(|binding| {
                state
                    .tags
                    .iter()
                    .find(|tag| tag.id() == binding.tag_id)
                    .cloned()
            })
            .collect())
    }
}
