use async_trait::async_trait;
use uuid::Uuid;

use authgraph_application::CatalogRepository;
use authgraph_core::AppResult;
use authgraph_domain::{CatalogPermission, CatalogRow, CatalogSubModule, Module};

use super::InMemoryAuthzRepository;

#[async_trait]
impl CatalogRepository for InMemoryAuthzRepository {
    async fn list_modules(&self) -> AppResult<Vec<Module>> {
        let state = self.state.read().await;
        let mut modules = state.modules.clone();
        modules.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(modules)
    }

    async fn module_exists(&self, module_id: Uuid) -> AppResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .modules
            .iter()
            .any(|module| module.id == module_id))
    }

    async fn permission_exists(&self, permission_id: Uuid) -> AppResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .permissions
            .iter()
            .any(|permission| permission.id == permission_id))
    }

    async fn list_permission_ids_for_module(&self, module_id: Uuid) -> AppResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .permissions
            .iter()
            .filter(|permission| {
                state
                    .sub_modules
                    .iter()
                    .any(|sub_module| {
                        sub_module.id == permission.sub_module_id
                            && sub_module.module_id == module_id
                    })
            })
            .map(|permission| permission.id)
            .collect())
    }

    async fn list_catalog_rows(&self, module_id: Option<Uuid>) -> AppResult<Vec<CatalogRow>> {
        let state = self.state.read().await;

        let mut modules: Vec<&Module> = state
            .modules
            .iter()
            .filter(|module| module_id.is_none_or(|id| module.id == id))
            .collect();
        modules.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        let mut rows = Vec::new();
        for module in modules {
            let sub_modules: Vec<_> = state
                .sub_modules
                .iter()
                .filter(|sub_module| sub_module.module_id == module.id)
                .collect();

            if sub_modules.is_empty() {
                rows.push(CatalogRow {
                    module_name: module.name.clone(),
                    sub_module: None,
                    permission: None,
                });
                continue;
            }

            for sub_module in sub_modules {
                let permissions: Vec<_> = state
                    .permissions
                    .iter()
                    .filter(|permission| permission.sub_module_id == sub_module.id)
                    .collect();

                if permissions.is_empty() {
                    rows.push(CatalogRow {
                        module_name: module.name.clone(),
                        sub_module: Some(CatalogSubModule {
                            name: sub_module.name.clone(),
                            description: sub_module.description.clone(),
                        }),
                        permission: None,
                    });
                    continue;
                }

                for permission in permissions {
                    rows.push(CatalogRow {
                        module_name: module.name.clone(),
                        sub_module: Some(CatalogSubModule {
                            name: sub_module.name.clone(),
                            description: sub_module.description.clone(),
                        }),
                        permission: Some(CatalogPermission {
                            id: permission.id,
                            name: permission.name.clone(),
                            is_superadmin_only: permission.is_superadmin_only,
                        }),
                    });
                }
            }
        }

        Ok(rows)
    }
}
