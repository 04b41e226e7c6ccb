use async_trait::async_trait;
use uuid::Uuid;

use authgraph_core::{AppError, AppResult, TenantId};
use authgraph_domain::{BindingKind, TagTargetKind};

/// Port for tenant-scoped existence checks against collaborating stores.
///
/// Datasets, apps and account memberships live outside this subsystem;
/// binding validation only needs to know whether a target exists under the
/// requesting tenant.
#[async_trait]
pub trait TargetDirectory: Send + Sync {
    /// Returns whether a knowledge dataset exists in the tenant.
    async fn dataset_exists(&self, tenant_id: TenantId, dataset_id: Uuid) -> AppResult<bool>;

    /// Returns whether an app exists in the tenant.
    async fn app_exists(&self, tenant_id: TenantId, app_id: Uuid) -> AppResult<bool>;

    /// Returns whether an account holds an active membership in the tenant.
    async fn membership_exists(&self, tenant_id: TenantId, account_id: Uuid) -> AppResult<bool>;

    /// Returns whether a role exists in the tenant.
    async fn role_exists(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<bool>;

    /// Returns whether an account exists at all, independent of tenant.
    async fn account_exists(&self, account_id: Uuid) -> AppResult<bool>;
}

/// Validates that every target of a group-binding batch exists in the tenant.
///
/// Fail-fast: the first missing target aborts the whole batch with a
/// kind-specific not-found error and nothing is partially validated. No side
/// effects.
pub async fn ensure_targets_exist(
    directory: &dyn TargetDirectory,
    tenant_id: TenantId,
    kind: BindingKind,
    target_ids: &[Uuid],
) -> AppResult<()> {
    for target_id in target_ids {
        let exists = match kind {
            BindingKind::Knowledge => directory.dataset_exists(tenant_id, *target_id).await?,
            BindingKind::App => directory.app_exists(tenant_id, *target_id).await?,
            BindingKind::User => directory.membership_exists(tenant_id, *target_id).await?,
            BindingKind::Role => directory.role_exists(tenant_id, *target_id).await?,
        };

        if !exists {
            return Err(AppError::NotFound(format!(
                "{} '{target_id}' not found in tenant '{tenant_id}'",
                kind.target_noun()
            )));
        }
    }

    Ok(())
}

/// Tag analogue of [`ensure_targets_exist`] over the narrower kind set.
pub async fn ensure_tag_targets_exist(
    directory: &dyn TargetDirectory,
    tenant_id: TenantId,
    kind: TagTargetKind,
    target_ids: &[Uuid],
) -> AppResult<()> {
    for target_id in target_ids {
        let exists = match kind {
            TagTargetKind::Knowledge => directory.dataset_exists(tenant_id, *target_id).await?,
            TagTargetKind::App => directory.app_exists(tenant_id, *target_id).await?,
            TagTargetKind::User => directory.membership_exists(tenant_id, *target_id).await?,
        };

        if !exists {
            return Err(AppError::NotFound(format!(
                "{} '{target_id}' not found in tenant '{tenant_id}'",
                kind.target_noun()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use uuid::Uuid;

    use authgraph_core::{AppError, AppResult, TenantId};
    use authgraph_domain::BindingKind;

    use super::{TargetDirectory, ensure_targets_exist};

    #[derive(Default)]
    struct FakeDirectory {
        datasets: HashSet<(TenantId, Uuid)>,
        apps: HashSet<(TenantId, Uuid)>,
        memberships: HashSet<(TenantId, Uuid)>,
        roles: HashSet<(TenantId, Uuid)>,
        accounts: HashSet<Uuid>,
    }

    #[async_trait]
    impl TargetDirectory for FakeDirectory {
        async fn dataset_exists(&self, tenant_id: TenantId, dataset_id: Uuid) -> AppResult<bool> {
            Ok(self.datasets.contains(&(tenant_id, dataset_id)))
        }

        async fn app_exists(&self, tenant_id: TenantId, app_id: Uuid) -> AppResult<bool> {
            Ok(self.apps.contains(&(tenant_id, app_id)))
        }

        async fn membership_exists(
            &self,
            tenant_id: TenantId,
            account_id: Uuid,
        ) -> AppResult<bool> {
            Ok(self.memberships.contains(&(tenant_id, account_id)))
        }

        async fn role_exists(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<bool> {
            Ok(self.roles.contains(&(tenant_id, role_id)))
        }

        async fn account_exists(&self, account_id: Uuid) -> AppResult<bool> {
            Ok(self.accounts.contains(&account_id))
        }
    }

    #[tokio::test]
    async fn dataset_in_another_tenant_is_not_found() {
        let owning_tenant = TenantId::new();
        let requesting_tenant = TenantId::new();
        let dataset_id = Uuid::new_v4();

        let mut directory = FakeDirectory::default();
        directory.datasets.insert((owning_tenant, dataset_id));

        let result = ensure_targets_exist(
            &directory,
            requesting_tenant,
            BindingKind::Knowledge,
            &[dataset_id],
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = ensure_targets_exist(
            &directory,
            owning_tenant,
            BindingKind::Knowledge,
            &[dataset_id],
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn first_missing_target_aborts_the_batch() {
        let tenant_id = TenantId::new();
        let known = Uuid::new_v4();
        let unknown = Uuid::new_v4();

        let mut directory = FakeDirectory::default();
        directory.roles.insert((tenant_id, known));

        let result =
            ensure_targets_exist(&directory, tenant_id, BindingKind::Role, &[known, unknown])
                .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn empty_batch_is_valid() {
        let directory = FakeDirectory::default();

        let result =
            ensure_targets_exist(&directory, TenantId::new(), BindingKind::App, &[]).await;
        assert!(result.is_ok());
    }
}
