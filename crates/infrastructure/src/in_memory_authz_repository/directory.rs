use async_trait::async_trait;
use uuid::Uuid;

use authgraph_application::TargetDirectory;
use authgraph_core::{AppResult, TenantId};

use super::InMemoryAuthzRepository;

#[async_trait]
impl TargetDirectory for InMemoryAuthzRepository {
    async fn dataset_exists(&self, tenant_id: TenantId, dataset_id: Uuid) -> AppResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .datasets
            .contains(&(tenant_id, dataset_id)))
    }

    async fn app_exists(&self, tenant_id: TenantId, app_id: Uuid) -> AppResult<bool> {
        Ok(self.state.read().await.apps.contains(&(tenant_id, app_id)))
    }

    async fn membership_exists(&self, tenant_id: TenantId, account_id: Uuid) -> AppResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .contains(&(tenant_id, account_id)))
    }

    async fn role_exists(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .roles
            .iter()
            .any(|role| role.tenant_id() == tenant_id && role.id() == role_id))
    }

    async fn account_exists(&self, account_id: Uuid) -> AppResult<bool> {
        Ok(self.state.read().await.accounts.contains(&account_id))
    }
}
