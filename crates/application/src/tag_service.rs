use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use authgraph_core::{Actor, AppError, AppResult};
use authgraph_domain::{Tag, TagBinding, TagTargetKind};

use crate::directory::{TargetDirectory, ensure_tag_targets_exist};
use crate::tag_ports::{TagOverview, TagRepository};

/// Application service for tags and tag bindings.
#[derive(Clone)]
pub struct TagService {
    repository: Arc<dyn TagRepository>,
    directory: Arc<dyn TargetDirectory>,
}

impl TagService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(repository: Arc<dyn TagRepository>, directory: Arc<dyn TargetDirectory>) -> Self {
        Self {
            repository,
            directory,
        }
    }

    /// Creates a tag, rejecting names already used within (tenant, kind)
    /// regardless of case.
    pub async fn create_tag(
        &self,
        actor: &Actor,
        kind: TagTargetKind,
        name: String,
    ) -> AppResult<Tag> {
        let tag = Tag::create(actor, kind, name)?;
        let duplicate = self
            .repository
            .find_tag_by_name(actor.tenant_id(), kind, tag.name().as_str())
            .await?;
        if duplicate.is_some() {
            return Err(AppError::Validation(format!(
                "tag name '{}' already exists",
                tag.name()
            )));
        }

        self.repository.insert_tag(tag.clone()).await?;
        Ok(tag)
    }

    /// Renames a tag, with the same case-insensitive uniqueness rule as
    /// creation.
    pub async fn update_tag(&self, actor: &Actor, tag_id: Uuid, name: String) -> AppResult<Tag> {
        let mut tag = self.find_tag(actor, tag_id).await?;
        tag.rename(name)?;

        let duplicate = self
            .repository
            .find_tag_by_name(actor.tenant_id(), tag.kind(), tag.name().as_str())
            .await?;
        if let Some(duplicate) = duplicate
            && duplicate.id() != tag.id()
        {
            return Err(AppError::Validation(format!(
                "tag name '{}' already exists",
                tag.name()
            )));
        }

        self.repository.update_tag(tag.clone()).await?;
        Ok(tag)
    }

    /// Lists tags of one kind, name ascending, with binding counts.
    pub async fn list_tags(
        &self,
        actor: &Actor,
        kind: TagTargetKind,
        keyword: Option<&str>,
    ) -> AppResult<Vec<TagOverview>> {
        self.repository
            .list_overviews(actor.tenant_id(), kind, keyword)
            .await
    }

    /// Deletes a tag together with every binding that carries it.
    pub async fn delete_tag(&self, actor: &Actor, tag_id: Uuid) -> AppResult<()> {
        let tag = self.find_tag(actor, tag_id).await?;
        self.repository
            .delete_tag_with_bindings(actor.tenant_id(), tag.id())
            .await
    }

    /// Counts targets carrying a tag.
    pub async fn binding_count(&self, actor: &Actor, tag_id: Uuid) -> AppResult<u64> {
        let tag = self.find_tag(actor, tag_id).await?;
        self.repository
            .count_bindings(actor.tenant_id(), tag.id())
            .await
    }

    /// Labels one target with a batch of tags.
    ///
    /// The target must exist in the tenant and every tag must exist with a
    /// matching kind; either failure aborts before anything is written.
    /// Pairs already bound are skipped.
    pub async fn tag_target(
        &self,
        actor: &Actor,
        kind: TagTargetKind,
        tag_ids: &[Uuid],
        target_id: Uuid,
    ) -> AppResult<()> {
        ensure_tag_targets_exist(
            self.directory.as_ref(),
            actor.tenant_id(),
            kind,
            &[target_id],
        )
        .await?;

        let mut seen = HashSet::new();
        let mut pending: Vec<TagBinding> = Vec::new();
        for tag_id in tag_ids {
            if !seen.insert(*tag_id) {
                continue;
            }

            let tag = self.find_tag(actor, *tag_id).await?;
            if tag.kind() != kind {
                return Err(AppError::Validation(format!(
                    "tag '{tag_id}' does not label {} targets",
                    kind.target_noun()
                )));
            }

            let existing = self
                .repository
                .find_tag_binding(actor.tenant_id(), tag.id(), target_id)
                .await?;
            if existing.is_some() {
                continue;
            }

            pending.push(TagBinding::new(actor, tag.id(), target_id, kind));
        }

        if pending.is_empty() {
            return Ok(());
        }
        self.repository.insert_tag_bindings(pending).await
    }

    /// Removes one tag from one target. An absent binding is a no-op.
    pub async fn untag_target(
        &self,
        actor: &Actor,
        tag_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<()> {
        let tag = self.find_tag(actor, tag_id).await?;
        self.repository
            .delete_tag_binding(actor.tenant_id(), tag.id(), target_id)
            .await
    }

    /// Lists ids of targets of one kind labeled by any of the given tags.
    pub async fn target_ids_for_tags(
        &self,
        actor: &Actor,
        kind: TagTargetKind,
        tag_ids: &[Uuid],
    ) -> AppResult<Vec<Uuid>> {
        self.repository
            .list_target_ids_for_tags(actor.tenant_id(), kind, tag_ids)
            .await
    }

    /// Lists the tags labeling one target of one kind.
    pub async fn tags_for_target(
        &self,
        actor: &Actor,
        kind: TagTargetKind,
        target_id: Uuid,
    ) -> AppResult<Vec<Tag>> {
        self.repository
            .list_tags_for_target(actor.tenant_id(), kind, target_id)
            .await
    }

    async fn find_tag(&self, actor: &Actor, tag_id: Uuid) -> AppResult<Tag> {
        self.repository
            .find_tag(actor.tenant_id(), tag_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("tag '{tag_id}' not found")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use authgraph_core::{Actor, AppError, AppResult, TenantId};
    use authgraph_domain::{Tag, TagBinding, TagTargetKind};

    use crate::TargetDirectory;

    use super::{TagOverview, TagRepository, TagService};

    #[derive(Default)]
    struct FakeTagRepository {
        tags: Mutex<Vec<Tag>>,
        bindings: Mutex<Vec<TagBinding>>,
    }

    #[async_trait]
    impl TagRepository for FakeTagRepository {
        async fn insert_tag(&self, tag: Tag) -> AppResult<()> {
            self.tags.lock().await.push(tag);
            Ok(())
        }

        async fn find_tag(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<Option<Tag>> {
            Ok(self
                .tags
                .lock()
                .await
                .iter()
                .find(|tag| tag.tenant_id() == tenant_id && tag.id() == tag_id)
                .cloned())
        }

        async fn update_tag(&self, tag: Tag) -> AppResult<()> {
            let mut tags = self.tags.lock().await;
            if let Some(stored) = tags.iter_mut().find(|stored| stored.id() == tag.id()) {
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
            Ok(self
                .tags
                .lock()
                .await
                .iter()
                .find(|tag| {
                    tag.tenant_id() == tenant_id
                        && tag.kind() == kind
                        && tag.name().as_str().eq_ignore_ascii_case(name)
                })
                .cloned())
        }

        async fn list_overviews(
            &self,
            tenant_id: TenantId,
            kind: TagTargetKind,
            keyword: Option<&str>,
        ) -> AppResult<Vec<TagOverview>> {
            let bindings = self.bindings.lock().await;
            let mut overviews: Vec<TagOverview> = self
                .tags
                .lock()
                .await
                .iter()
                .filter(|tag| tag.tenant_id() == tenant_id && tag.kind() == kind)
                .filter(|tag| {
                    keyword.is_none_or(|keyword| tag.name().as_str().contains(keyword))
                })
                .map(|tag| TagOverview {
                    id: tag.id(),
                    kind: tag.kind(),
                    name: tag.name().as_str().to_owned(),
                    binding_count: bindings
                        .iter()
                        .filter(|binding| binding.tag_id == tag.id())
                        .count() as u64,
                })
                .collect();
            overviews.sort_by(|left, right| left.name.cmp(&right.name));
            Ok(overviews)
        }

        async fn delete_tag_with_bindings(
            &self,
            tenant_id: TenantId,
            tag_id: Uuid,
        ) -> AppResult<()> {
            self.tags
                .lock()
                .await
                .retain(|tag| !(tag.tenant_id() == tenant_id && tag.id() == tag_id));
            self.bindings
                .lock()
                .await
                .retain(|binding| binding.tag_id != tag_id);
            Ok(())
        }

        async fn count_bindings(&self, tenant_id: TenantId, tag_id: Uuid) -> AppResult<u64> {
            Ok(self
                .bindings
                .lock()
                .await
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
                .bindings
                .lock()
                .await
                .iter()
                .find(|binding| {
                    binding.tenant_id == tenant_id
                        && binding.tag_id == tag_id
                        && binding.target_id == target_id
                })
                .cloned())
        }

        async fn insert_tag_bindings(&self, bindings: Vec<TagBinding>) -> AppResult<()> {
            self.bindings.lock().await.extend(bindings);
            Ok(())
        }

        async fn delete_tag_binding(
            &self,
            tenant_id: TenantId,
            tag_id: Uuid,
            target_id: Uuid,
        ) -> AppResult<()> {
            self.bindings.lock().await.retain(|binding| {
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
                .bindings
                .lock()
                .await
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
            let tags = self.tags.lock().await;
            Ok(self
                .bindings
                .lock()
                .await
                .iter()
                .filter(|binding| {
                    binding.tenant_id == tenant_id
                        && binding.kind == kind
                        && binding.target_id == target_id
                })
                .filter_map(|binding| {
                    tags.iter().find(|tag| tag.id() == binding.tag_id).cloned()
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeDirectory {
        datasets: HashSet<(TenantId, Uuid)>,
    }

    #[async_trait]
    impl TargetDirectory for FakeDirectory {
        async fn dataset_exists(&self, tenant_id: TenantId, dataset_id: Uuid) -> AppResult<bool> {
            Ok(self.datasets.contains(&(tenant_id, dataset_id)))
        }

        async fn app_exists(&self, _tenant_id: TenantId, _app_id: Uuid) -> AppResult<bool> {
            Ok(false)
        }

        async fn membership_exists(
            &self,
            _tenant_id: TenantId,
            _account_id: Uuid,
        ) -> AppResult<bool> {
            Ok(false)
        }

        async fn role_exists(&self, _tenant_id: TenantId, _role_id: Uuid) -> AppResult<bool> {
            Ok(false)
        }

        async fn account_exists(&self, _account_id: Uuid) -> AppResult<bool> {
            Ok(false)
        }
    }

    fn actor() -> Actor {
        Actor::new(Uuid::new_v4(), TenantId::new())
    }

    fn service(directory: FakeDirectory) -> (TagService, Arc<FakeTagRepository>) {
        let repository = Arc::new(FakeTagRepository::default());
        let service = TagService::new(repository.clone(), Arc::new(directory));
        (service, repository)
    }

    #[tokio::test]
    async fn tag_names_are_unique_per_kind_ignoring_case() {
        let actor = actor();
        let (service, _) = service(FakeDirectory::default());

        let created = service
            .create_tag(&actor, TagTargetKind::Knowledge, "Finance".to_owned())
            .await;
        assert!(created.is_ok());

        let duplicate = service
            .create_tag(&actor, TagTargetKind::Knowledge, "fiNANce".to_owned())
            .await;
        assert!(matches!(duplicate, Err(AppError::Validation(_))));

        let other_kind = service
            .create_tag(&actor, TagTargetKind::App, "Finance".to_owned())
            .await;
        assert!(other_kind.is_ok());
    }

    #[tokio::test]
    async fn rename_to_own_name_is_allowed() {
        let actor = actor();
        let (service, _) = service(FakeDirectory::default());

        let tag = service
            .create_tag(&actor, TagTargetKind::Knowledge, "Finance".to_owned())
            .await
            .unwrap_or_else(|_| unreachable!());

        let renamed = service
            .update_tag(&actor, tag.id(), "FINANCE".to_owned())
            .await;
        assert!(renamed.is_ok());
    }

    #[tokio::test]
    async fn rename_to_another_tags_name_is_rejected() {
        let actor = actor();
        let (service, _) = service(FakeDirectory::default());

        let created = service
            .create_tag(&actor, TagTargetKind::Knowledge, "Finance".to_owned())
            .await;
        assert!(created.is_ok());
        let tag = service
            .create_tag(&actor, TagTargetKind::Knowledge, "Legal".to_owned())
            .await
            .unwrap_or_else(|_| unreachable!());

        let renamed = service
            .update_tag(&actor, tag.id(), "finance".to_owned())
            .await;
        assert!(matches!(renamed, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn tagging_skips_pairs_already_bound() {
        let actor = actor();
        let dataset = Uuid::new_v4();
        let mut directory = FakeDirectory::default();
        directory.datasets.insert((actor.tenant_id(), dataset));

        let (service, repository) = service(directory);
        let tag = service
            .create_tag(&actor, TagTargetKind::Knowledge, "Finance".to_owned())
            .await
            .unwrap_or_else(|_| unreachable!());

        for _ in 0..2 {
            let tagged = service
                .tag_target(&actor, TagTargetKind::Knowledge, &[tag.id()], dataset)
                .await;
            assert!(tagged.is_ok());
        }

        assert_eq!(repository.bindings.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn tagging_rejects_a_kind_mismatch() {
        let actor = actor();
        let dataset = Uuid::new_v4();
        let mut directory = FakeDirectory::default();
        directory.datasets.insert((actor.tenant_id(), dataset));

        let (service, repository) = service(directory);
        let app_tag = service
            .create_tag(&actor, TagTargetKind::App, "Internal".to_owned())
            .await
            .unwrap_or_else(|_| unreachable!());

        let tagged = service
            .tag_target(&actor, TagTargetKind::Knowledge, &[app_tag.id()], dataset)
            .await;
        assert!(matches!(tagged, Err(AppError::Validation(_))));
        assert!(repository.bindings.lock().await.is_empty());
    }

    #[tokio::test]
    async fn tagging_an_unknown_target_is_not_found() {
        let actor = actor();
        let (service, _) = service(FakeDirectory::default());

        let tag = service
            .create_tag(&actor, TagTargetKind::Knowledge, "Finance".to_owned())
            .await
            .unwrap_or_else(|_| unreachable!());

        let tagged = service
            .tag_target(&actor, TagTargetKind::Knowledge, &[tag.id()], Uuid::new_v4())
            .await;
        assert!(matches!(tagged, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn deleting_a_tag_removes_its_bindings() {
        let actor = actor();
        let dataset = Uuid::new_v4();
        let mut directory = FakeDirectory::default();
        directory.datasets.insert((actor.tenant_id(), dataset));

        let (service, repository) = service(directory);
        let tag = service
            .create_tag(&actor, TagTargetKind::Knowledge, "Finance".to_owned())
            .await
            .unwrap_or_else(|_| unreachable!());

        let tagged = service
            .tag_target(&actor, TagTargetKind::Knowledge, &[tag.id()], dataset)
            .await;
        assert!(tagged.is_ok());

        let deleted = service.delete_tag(&actor, tag.id()).await;
        assert!(deleted.is_ok());
        assert!(repository.bindings.lock().await.is_empty());
        assert!(repository.tags.lock().await.is_empty());
    }

    #[tokio::test]
    async fn untagging_an_absent_binding_is_a_noop() {
        let actor = actor();
        let (service, _) = service(FakeDirectory::default());

        let tag = service
            .create_tag(&actor, TagTargetKind::Knowledge, "Finance".to_owned())
            .await
            .unwrap_or_else(|_| unreachable!());

        let result = service.untag_target(&actor, tag.id(), Uuid::new_v4()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn target_lookup_deduplicates_across_tags() {
        let actor = actor();
        let dataset = Uuid::new_v4();
        let mut directory = FakeDirectory::default();
        directory.datasets.insert((actor.tenant_id(), dataset));

        let (service, _) = service(directory);
        let finance = service
            .create_tag(&actor, TagTargetKind::Knowledge, "Finance".to_owned())
            .await
            .unwrap_or_else(|_| unreachable!());
        let legal = service
            .create_tag(&actor, TagTargetKind::Knowledge, "Legal".to_owned())
            .await
            .unwrap_or_else(|_| unreachable!());

        for tag in [&finance, &legal] {
            let tagged = service
                .tag_target(&actor, TagTargetKind::Knowledge, &[tag.id()], dataset)
                .await;
            assert!(tagged.is_ok());
        }

        let targets = service
            .target_ids_for_tags(&actor, TagTargetKind::Knowledge, &[finance.id(), legal.id()])
            .await
            .unwrap_or_default();
        assert_eq!(targets, vec![dataset]);
    }
}
