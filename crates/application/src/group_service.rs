use std::sync::Arc;

use uuid::Uuid;

use authgraph_core::{Actor, AppError, AppResult};
use authgraph_domain::{BindingKind, Group, GroupBinding, SUPERUSER_ROLE_NAMES, replace_diff};

use crate::directory::{TargetDirectory, ensure_targets_exist};
use crate::group_ports::{
    CreateGroupInput, GroupListQuery, GroupPage, GroupRepository, UpdateGroupInput,
};

/// Longest keyword honored by group listing; longer input is truncated.
const KEYWORD_MAX_LENGTH: usize = 30;

/// Application service for group CRUD, group bindings and cascade deletion.
#[derive(Clone)]
pub struct GroupService {
    repository: Arc<dyn GroupRepository>,
    directory: Arc<dyn TargetDirectory>,
}

impl GroupService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(repository: Arc<dyn GroupRepository>, directory: Arc<dyn TargetDirectory>) -> Self {
        Self {
            repository,
            directory,
        }
    }

    /// Creates a group in the actor's tenant.
    pub async fn create_group(&self, actor: &Actor, input: CreateGroupInput) -> AppResult<Group> {
        let group = Group::create(actor, input.name, input.agency_name, input.description)?;
        self.repository.insert_group(group.clone()).await?;
        Ok(group)
    }

    /// Returns a group or a not-found error, never a cross-tenant row.
    pub async fn view_group(&self, actor: &Actor, group_id: Uuid) -> AppResult<Group> {
        self.repository
            .find_group(actor.tenant_id(), group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group '{group_id}' not found")))
    }

    /// Updates the editable fields of a group.
    pub async fn update_group(
        &self,
        actor: &Actor,
        group_id: Uuid,
        input: UpdateGroupInput,
    ) -> AppResult<Group> {
        let mut group = self.view_group(actor, group_id).await?;
        group.apply_update(input.name, input.agency_name, input.description)?;
        self.repository.update_group(group.clone()).await?;
        Ok(group)
    }

    /// Lists groups newest first, filtered by keyword over name and agency
    /// name. Keywords are truncated to thirty characters.
    pub async fn list_groups(&self, actor: &Actor, query: GroupListQuery) -> AppResult<GroupPage> {
        let keyword = query
            .keyword
            .map(|keyword| keyword.chars().take(KEYWORD_MAX_LENGTH).collect());

        self.repository
            .list_groups(actor.tenant_id(), GroupListQuery { keyword, ..query })
            .await
    }

    /// Deletes a group and cascades into its bindings.
    ///
    /// Bindings of kind `role` pull the bound role and all of that role's
    /// permission joins into the deletion; the repository applies the whole
    /// cascade as one atomic unit.
    pub async fn delete_group(&self, actor: &Actor, group_id: Uuid) -> AppResult<()> {
        let group = self.view_group(actor, group_id).await?;

        let bindings = self
            .repository
            .list_bindings_for_group(actor.tenant_id(), group.id())
            .await?;
        let role_ids: Vec<Uuid> = bindings
            .iter()
            .filter(|binding| binding.kind == BindingKind::Role)
            .map(|binding| binding.target_id)
            .collect();

        self.repository
            .delete_group_cascade(actor.tenant_id(), group.id(), &role_ids)
            .await
    }

    /// Attaches targets of one kind to a group.
    ///
    /// Validation is fail-fast: one missing target writes nothing. Targets
    /// already bound to any group in the tenant are skipped, which makes the
    /// operation idempotent.
    pub async fn attach_targets(
        &self,
        actor: &Actor,
        group_id: Uuid,
        kind: BindingKind,
        target_ids: &[Uuid],
    ) -> AppResult<()> {
        let group = self.view_group(actor, group_id).await?;
        ensure_targets_exist(self.directory.as_ref(), actor.tenant_id(), kind, target_ids).await?;

        let insert = self
            .bindings_for_unbound_targets(actor, group.id(), kind, target_ids)
            .await?;
        if insert.is_empty() {
            return Ok(());
        }

        self.repository
            .apply_binding_diff(actor.tenant_id(), group.id(), kind, &[], insert)
            .await
    }

    /// Detaches targets of one kind from a group. Absent bindings are a
    /// no-op, not an error.
    pub async fn detach_targets(
        &self,
        actor: &Actor,
        group_id: Uuid,
        kind: BindingKind,
        target_ids: &[Uuid],
    ) -> AppResult<()> {
        let group = self.view_group(actor, group_id).await?;
        ensure_targets_exist(self.directory.as_ref(), actor.tenant_id(), kind, target_ids).await?;

        if target_ids.is_empty() {
            return Ok(());
        }

        self.repository
            .apply_binding_diff(actor.tenant_id(), group.id(), kind, target_ids, Vec::new())
            .await
    }

    /// Replaces the bound target set for (group, kind) with the requested
    /// set.
    ///
    /// The diff against the current set is computed once and applied as one
    /// atomic unit: removed members are deleted, added members attached,
    /// unchanged members untouched. Added targets already bound elsewhere
    /// are skipped, mirroring attach semantics.
    pub async fn replace_targets(
        &self,
        actor: &Actor,
        group_id: Uuid,
        kind: BindingKind,
        new_target_ids: &[Uuid],
    ) -> AppResult<()> {
        let group = self.view_group(actor, group_id).await?;
        ensure_targets_exist(
            self.directory.as_ref(),
            actor.tenant_id(),
            kind,
            new_target_ids,
        )
        .await?;

        let current = self
            .repository
            .list_target_ids(actor.tenant_id(), group.id(), kind)
            .await?;
        let diff = replace_diff(&current, new_target_ids);
        if diff.is_empty() {
            return Ok(());
        }

        let insert = self
            .bindings_for_unbound_targets(actor, group.id(), kind, &diff.to_add)
            .await?;

        self.repository
            .apply_binding_diff(
                actor.tenant_id(),
                group.id(),
                kind,
                &diff.to_remove,
                insert,
            )
            .await
    }

    /// Lists target ids bound to a group for one kind; empty when none.
    pub async fn target_ids(
        &self,
        actor: &Actor,
        group_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<Vec<Uuid>> {
        self.repository
            .list_target_ids(actor.tenant_id(), group_id, kind)
            .await
    }

    /// Lists group ids a target is bound to for one kind; empty when none.
    pub async fn group_ids_for_target(
        &self,
        actor: &Actor,
        target_id: Uuid,
        kind: BindingKind,
    ) -> AppResult<Vec<Uuid>> {
        self.repository
            .list_group_ids_for_target(actor.tenant_id(), target_id, kind)
            .await
    }

    /// Counts knowledge bindings owned by a group.
    pub async fn knowledge_count(&self, actor: &Actor, group_id: Uuid) -> AppResult<u64> {
        self.repository
            .count_bindings(actor.tenant_id(), group_id, BindingKind::Knowledge)
            .await
    }

    /// Counts app bindings owned by a group.
    pub async fn app_count(&self, actor: &Actor, group_id: Uuid) -> AppResult<u64> {
        self.repository
            .count_bindings(actor.tenant_id(), group_id, BindingKind::App)
            .await
    }

    /// Counts user bindings owned by a group.
    pub async fn user_count(&self, actor: &Actor, group_id: Uuid) -> AppResult<u64> {
        self.repository
            .count_bindings(actor.tenant_id(), group_id, BindingKind::User)
            .await
    }

    /// Counts roles visible to a group: unbound (global) roles excluding the
    /// fixed superuser names, plus roles explicitly bound to the group.
    pub async fn role_count(&self, actor: &Actor, group_id: Uuid) -> AppResult<u64> {
        let unbound = self
            .repository
            .count_unbound_roles(actor.tenant_id(), &SUPERUSER_ROLE_NAMES)
            .await?;
        let bound = self
            .repository
            .count_bindings(actor.tenant_id(), group_id, BindingKind::Role)
            .await?;
        Ok(unbound + bound)
    }

    /// Builds binding rows for the targets not yet bound to any group,
    /// collapsing duplicates in the input.
    async fn bindings_for_unbound_targets(
        &self,
        actor: &Actor,
        group_id: Uuid,
        kind: BindingKind,
        target_ids: &[Uuid],
    ) -> AppResult<Vec<GroupBinding>> {
        let mut seen = std::collections::HashSet::new();
        let mut insert = Vec::new();

        for target_id in target_ids {
            if !seen.insert(*target_id) {
                continue;
            }

            let existing = self
                .repository
                .find_binding_for_target(actor.tenant_id(), *target_id)
                .await?;
            if existing.is_some() {
                continue;
            }

            insert.push(GroupBinding::new(actor, group_id, *target_id, kind));
        }

        Ok(insert)
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
    use authgraph_domain::{BindingKind, Group, GroupBinding};

    use crate::TargetDirectory;

    use super::{
        CreateGroupInput, GroupListQuery, GroupPage, GroupRepository, GroupService,
        UpdateGroupInput,
    };

    #[derive(Default)]
    struct FakeGroupRepository {
        groups: Mutex<Vec<Group>>,
        bindings: Mutex<Vec<GroupBinding>>,
        cascade_calls: Mutex<Vec<(Uuid, Vec<Uuid>)>>,
        excluded_name_calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl GroupRepository for FakeGroupRepository {
        async fn insert_group(&self, group: Group) -> AppResult<()> {
            self.groups.lock().await.push(group);
            Ok(())
        }

        async fn find_group(
            &self,
            tenant_id: TenantId,
            group_id: Uuid,
        ) -> AppResult<Option<Group>> {
            Ok(self
                .groups
                .lock()
                .await
                .iter()
                .find(|group| group.tenant_id() == tenant_id && group.id() == group_id)
                .cloned())
        }

        async fn update_group(&self, group: Group) -> AppResult<()> {
            let mut groups = self.groups.lock().await;
            if let Some(stored) = groups.iter_mut().find(|stored| stored.id() == group.id()) {
                *stored = group;
            }
            Ok(())
        }

        async fn list_groups(
            &self,
            tenant_id: TenantId,
            _query: GroupListQuery,
        ) -> AppResult<GroupPage> {
            let groups = self
                .groups
                .lock()
                .await
                .iter()
                .filter(|group| group.tenant_id() == tenant_id)
                .cloned()
                .collect();
            Ok(GroupPage {
                groups,
                has_more: false,
            })
        }

        async fn list_bindings_for_group(
            &self,
            tenant_id: TenantId,
            group_id: Uuid,
        ) -> AppResult<Vec<GroupBinding>> {
            Ok(self
                .bindings
                .lock()
                .await
                .iter()
                .filter(|binding| {
                    binding.tenant_id == tenant_id && binding.group_id == group_id
                })
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
                .bindings
                .lock()
                .await
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
                .bindings
                .lock()
                .await
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
                .bindings
                .lock()
                .await
                .iter()
                .find(|binding| {
                    binding.tenant_id == tenant_id && binding.target_id == target_id
                })
                .cloned())
        }

        async fn count_bindings(
            &self,
            tenant_id: TenantId,
            group_id: Uuid,
            kind: BindingKind,
        ) -> AppResult<u64> {
            Ok(self
                .list_target_ids(tenant_id, group_id, kind)
                .await?
                .len() as u64)
        }

        async fn count_unbound_roles(
            &self,
            _tenant_id: TenantId,
            excluded_role_names: &[&str],
        ) -> AppResult<u64> {
            self.excluded_name_calls.lock().await.push(
                excluded_role_names
                    .iter()
                    .map(|name| (*name).to_owned())
                    .collect(),
            );
            Ok(0)
        }

        async fn apply_binding_diff(
            &self,
            tenant_id: TenantId,
            group_id: Uuid,
            kind: BindingKind,
            remove_target_ids: &[Uuid],
            insert: Vec<GroupBinding>,
        ) -> AppResult<()> {
            let mut bindings = self.bindings.lock().await;
            bindings.retain(|binding| {
                !(binding.tenant_id == tenant_id
                    && binding.group_id == group_id
                    && binding.kind == kind
                    && remove_target_ids.contains(&binding.target_id))
            });
            bindings.extend(insert);
            Ok(())
        }

        async fn delete_group_cascade(
            &self,
            tenant_id: TenantId,
            group_id: Uuid,
            role_ids: &[Uuid],
        ) -> AppResult<()> {
            self.cascade_calls
                .lock()
                .await
                .push((group_id, role_ids.to_vec()));
            self.bindings
                .lock()
                .await
                .retain(|binding| binding.group_id != group_id);
            self.groups
                .lock()
                .await
                .retain(|group| !(group.tenant_id() == tenant_id && group.id() == group_id));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDirectory {
        datasets: HashSet<(TenantId, Uuid)>,
        roles: HashSet<(TenantId, Uuid)>,
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

        async fn role_exists(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<bool> {
            Ok(self.roles.contains(&(tenant_id, role_id)))
        }

        async fn account_exists(&self, _account_id: Uuid) -> AppResult<bool> {
            Ok(false)
        }
    }

    fn actor() -> Actor {
        Actor::new(Uuid::new_v4(), TenantId::new())
    }

    async fn group_with_service(
        actor: &Actor,
        directory: FakeDirectory,
    ) -> (GroupService, Arc<FakeGroupRepository>, Group) {
        let repository = Arc::new(FakeGroupRepository::default());
        let service = GroupService::new(repository.clone(), Arc::new(directory));
        let group = service
            .create_group(
                actor,
                CreateGroupInput {
                    name: "Region A".to_owned(),
                    agency_name: "Agency1".to_owned(),
                    description: "d".to_owned(),
                },
            )
            .await
            .unwrap_or_else(|_| unreachable!());
        (service, repository, group)
    }

    #[tokio::test]
    async fn create_group_rejects_over_long_name() {
        let actor = actor();
        let service = GroupService::new(
            Arc::new(FakeGroupRepository::default()),
            Arc::new(FakeDirectory::default()),
        );

        let result = service
            .create_group(
                &actor,
                CreateGroupInput {
                    name: "x".repeat(51),
                    agency_name: "Agency1".to_owned(),
                    description: "d".to_owned(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn view_group_rejects_other_tenant() {
        let actor = actor();
        let (service, _, group) = group_with_service(&actor, FakeDirectory::default()).await;

        let stranger = Actor::new(Uuid::new_v4(), TenantId::new());
        let result = service.view_group(&stranger, group.id()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_group_persists_edited_fields() {
        let actor = actor();
        let (service, _, group) = group_with_service(&actor, FakeDirectory::default()).await;

        let updated = service
            .update_group(
                &actor,
                group.id(),
                UpdateGroupInput {
                    name: "Region B".to_owned(),
                    agency_name: "Agency2".to_owned(),
                    description: "updated".to_owned(),
                },
            )
            .await;
        assert!(updated.is_ok());

        let viewed = service.view_group(&actor, group.id()).await;
        assert!(viewed.is_ok());
        let Ok(viewed) = viewed else {
            panic!("group vanished after update");
        };
        assert_eq!(viewed.name().as_str(), "Region B");
    }

    #[tokio::test]
    async fn attach_validates_before_writing_anything() {
        let actor = actor();
        let known = Uuid::new_v4();
        let unknown = Uuid::new_v4();
        let mut directory = FakeDirectory::default();
        directory.datasets.insert((actor.tenant_id(), known));

        let (service, repository, group) = group_with_service(&actor, directory).await;

        let result = service
            .attach_targets(&actor, group.id(), BindingKind::Knowledge, &[known, unknown])
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(repository.bindings.lock().await.is_empty());
    }

    #[tokio::test]
    async fn attach_is_idempotent_per_target() {
        let actor = actor();
        let dataset = Uuid::new_v4();
        let mut directory = FakeDirectory::default();
        directory.datasets.insert((actor.tenant_id(), dataset));

        let (service, _, group) = group_with_service(&actor, directory).await;

        for _ in 0..2 {
            let result = service
                .attach_targets(&actor, group.id(), BindingKind::Knowledge, &[dataset, dataset])
                .await;
            assert!(result.is_ok());
        }

        let targets = service
            .target_ids(&actor, group.id(), BindingKind::Knowledge)
            .await;
        assert_eq!(targets.unwrap_or_default(), vec![dataset]);
    }

    #[tokio::test]
    async fn attach_skips_targets_bound_to_another_group() {
        let actor = actor();
        let dataset = Uuid::new_v4();
        let mut directory = FakeDirectory::default();
        directory.datasets.insert((actor.tenant_id(), dataset));

        let (service, _, first_group) = group_with_service(&actor, directory).await;
        let second_group = service
            .create_group(
                &actor,
                CreateGroupInput {
                    name: "Region B".to_owned(),
                    agency_name: "Agency2".to_owned(),
                    description: "d".to_owned(),
                },
            )
            .await
            .unwrap_or_else(|_| unreachable!());

        let attached = service
            .attach_targets(&actor, first_group.id(), BindingKind::Knowledge, &[dataset])
            .await;
        assert!(attached.is_ok());

        let attached_elsewhere = service
            .attach_targets(&actor, second_group.id(), BindingKind::Knowledge, &[dataset])
            .await;
        assert!(attached_elsewhere.is_ok());

        let second_targets = service
            .target_ids(&actor, second_group.id(), BindingKind::Knowledge)
            .await;
        assert!(second_targets.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn replace_leaves_exactly_the_requested_set() {
        let actor = actor();
        let kept = Uuid::new_v4();
        let removed = Uuid::new_v4();
        let added = Uuid::new_v4();
        let mut directory = FakeDirectory::default();
        for dataset in [kept, removed, added] {
            directory.datasets.insert((actor.tenant_id(), dataset));
        }

        let (service, _, group) = group_with_service(&actor, directory).await;

        let attached = service
            .attach_targets(&actor, group.id(), BindingKind::Knowledge, &[kept, removed])
            .await;
        assert!(attached.is_ok());

        let replaced = service
            .replace_targets(&actor, group.id(), BindingKind::Knowledge, &[kept, added])
            .await;
        assert!(replaced.is_ok());

        let targets = service
            .target_ids(&actor, group.id(), BindingKind::Knowledge)
            .await
            .unwrap_or_default();
        assert_eq!(targets, vec![kept, added]);
    }

    #[tokio::test]
    async fn detach_of_absent_binding_is_a_noop() {
        let actor = actor();
        let dataset = Uuid::new_v4();
        let mut directory = FakeDirectory::default();
        directory.datasets.insert((actor.tenant_id(), dataset));

        let (service, _, group) = group_with_service(&actor, directory).await;

        let result = service
            .detach_targets(&actor, group.id(), BindingKind::Knowledge, &[dataset])
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn delete_group_collects_bound_roles_for_the_cascade() {
        let actor = actor();
        let role_id = Uuid::new_v4();
        let mut directory = FakeDirectory::default();
        directory.roles.insert((actor.tenant_id(), role_id));

        let (service, repository, group) = group_with_service(&actor, directory).await;

        let attached = service
            .attach_targets(&actor, group.id(), BindingKind::Role, &[role_id])
            .await;
        assert!(attached.is_ok());

        let deleted = service.delete_group(&actor, group.id()).await;
        assert!(deleted.is_ok());

        let calls = repository.cascade_calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (group.id(), vec![role_id]));

        drop(calls);
        let viewed = service.view_group(&actor, group.id()).await;
        assert!(matches!(viewed, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn role_count_passes_the_superuser_exclusion_set() {
        let actor = actor();
        let (service, repository, group) = group_with_service(&actor, FakeDirectory::default()).await;

        let count = service.role_count(&actor, group.id()).await;
        assert!(count.is_ok());

        let calls = repository.excluded_name_calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec!["Superadministrator".to_owned(), "System Operator".to_owned()]
        );
    }

    #[tokio::test]
    async fn list_groups_truncates_long_keywords() {
        let actor = actor();
        let (service, _, _) = group_with_service(&actor, FakeDirectory::default()).await;

        let result = service
            .list_groups(
                &actor,
                GroupListQuery {
                    keyword: Some("k".repeat(64)),
                    ..GroupListQuery::default()
                },
            )
            .await;
        assert!(result.is_ok());
    }
}
