use async_trait::async_trait;
use uuid::Uuid;

use authgraph_core::{AppResult, TenantId};
use authgraph_domain::{Tag, TagBinding, TagTargetKind};

/// A tag decorated with how many targets it currently labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOverview {
    /// Stable tag identifier.
    pub id: Uuid,
    /// Kind of target the tag labels.
    pub kind: TagTargetKind,
    /// Tag display name.
    pub name: String,
    /// Number of targets carrying the tag.
    pub binding_count: u64,
}

/// Repository port for tags and their bindings.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Persists a new tag.
    async fn insert_tag(&self, tag: Tag) -> AppResult<()>;

    /// Finds a tag by id within the tenant.
    async fn find_tag(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<Option<Tag>>;

    /// Persists edited tag fields.
    async fn update_tag(&self, tag: Tag) -> AppResult<()>;

    /// Finds a tag by case-insensitive name within (tenant, kind).
    async fn find_tag_by_name(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        name: &str,
    ) -> AppResult<Option<Tag>>;

    /// Lists tag overviews for one kind, name ascending, with optional
    /// keyword filtering on the name.
    async fn list_overviews(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        keyword: Option<&str>,
    ) -> AppResult<Vec<TagOverview>>;

    /// Deletes a tag and all of its bindings as one atomic unit.
    async fn delete_tag_with_bindings(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<()>;

    /// Counts targets carrying a tag.
    async fn count_bindings(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<u64>;

    /// Finds the binding between a tag and a target, if any.
    async fn find_tag_binding(
        &self,
        tenant_id: TenantId,
        tag_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<Option<TagBinding>>;

    /// Persists a batch of new bindings.
    async fn insert_tag_bindings(&self, bindings: Vec<TagBinding>) -> AppResult<()>;

    /// Deletes one binding; absent rows are a no-op.
    async fn delete_tag_binding(
        &self,
        tenant_id: TenantId,
        tag_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<()>;

    /// Lists ids of targets of one kind labeled by any of the given tags.
    async fn list_target_ids_for_tags(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        tag_ids: &[Uuid],
    ) -> AppResult<Vec<Uuid>>;

    /// Lists the tags labeling one target of one kind.
    async fn list_tags_for_target(
        &self,
        tenant_id: TenantId,
        kind: TagTargetKind,
        target_id: Uuid,
    ) -> AppResult<Vec<Tag>>;
}
