use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use authgraph_core::{Actor, AppError, AppResult};
use authgraph_domain::{Module, ModuleNode, build_permission_tree};

use crate::catalog_ports::CatalogRepository;
use crate::role_ports::RoleRepository;

/// Application service for browsing the permission catalog.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    roles: Arc<dyn RoleRepository>,
}

impl CatalogService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, roles: Arc<dyn RoleRepository>) -> Self {
        Self { catalog, roles }
    }

    /// Lists catalog modules newest first.
    pub async fn list_modules(&self) -> AppResult<Vec<Module>> {
        self.catalog.list_modules().await
    }

    /// Builds the nested permission tree, optionally scoped to one module
    /// and optionally annotated against one role's grants.
    ///
    /// Without a role the tree carries no selection flags at all; with one,
    /// every permission is marked selected or not.
    pub async fn permission_tree(
        &self,
        actor: &Actor,
        module_id: Option<Uuid>,
        role_id: Option<Uuid>,
    ) -> AppResult<Vec<ModuleNode>> {
        if let Some(module_id) = module_id
            && !self.catalog.module_exists(module_id).await?
        {
            return Err(AppError::NotFound(format!(
                "module '{module_id}' not found"
            )));
        }

        let selected = match role_id {
            Some(role_id) => {
                let role = self
                    .roles
                    .find_role(actor.tenant_id(), role_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' not found")))?;
                let ids: HashSet<Uuid> = self
                    .roles
                    .list_permission_ids(actor.tenant_id(), role.id())
                    .await?
                    .into_iter()
                    .collect();
                Some(ids)
            }
            None => None,
        };

        let rows = self.catalog.list_catalog_rows(module_id).await?;
        Ok(build_permission_tree(&rows, selected.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use authgraph_core::{Actor, AppError, AppResult, TenantId};
    use authgraph_domain::{
        CatalogPermission, CatalogRow, CatalogSubModule, Module, Role, RoleAccountJoin,
        RolePermissionJoin,
    };

    use crate::role_ports::{RoleOverview, RoleRepository};

    use super::{CatalogRepository, CatalogService};

    struct FakeCatalog {
        module_id: Uuid,
        rows: Vec<CatalogRow>,
    }

    #[async_trait]
    impl CatalogRepository for FakeCatalog {
        async fn list_modules(&self) -> AppResult<Vec<Module>> {
            Ok(Vec::new())
        }

        async fn module_exists(&self, module_id: Uuid) -> AppResult<bool> {
            Ok(module_id == self.module_id)
        }

        async fn permission_exists(&self, _permission_id: Uuid) -> AppResult<bool> {
            Ok(false)
        }

        async fn list_permission_ids_for_module(&self, _module_id: Uuid) -> AppResult<Vec<Uuid>> {
            Ok(Vec::new())
        }

        async fn list_catalog_rows(&self, _module_id: Option<Uuid>) -> AppResult<Vec<CatalogRow>> {
            Ok(self.rows.clone())
        }
    }

    #[derive(Default)]
    struct FakeRoles {
        roles: Mutex<Vec<Role>>,
        permission_joins: Mutex<Vec<RolePermissionJoin>>,
    }

    #[async_trait]
    impl RoleRepository for FakeRoles {
        async fn insert_role(&self, role: Role) -> AppResult<()> {
            self.roles.lock().await.push(role);
            Ok(())
        }

        async fn find_role(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<Option<Role>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .find(|role| role.tenant_id() == tenant_id && role.id() == role_id)
                .cloned())
        }

        async fn update_role(&self, _role: Role) -> AppResult<()> {
            Ok(())
        }

        async fn list_overviews(
            &self,
            _tenant_id: TenantId,
            _keyword: Option<&str>,
        ) -> AppResult<Vec<RoleOverview>> {
            Ok(Vec::new())
        }

        async fn find_overview(
            &self,
            _tenant_id: TenantId,
            _role_id: Uuid,
        ) -> AppResult<Option<RoleOverview>> {
            Ok(None)
        }

        async fn delete_role_with_permission_joins(
            &self,
            _tenant_id: TenantId,
            _role_id: Uuid,
        ) -> AppResult<()> {
            Ok(())
        }

        async fn list_permission_ids(
            &self,
            tenant_id: TenantId,
            role_id: Uuid,
        ) -> AppResult<Vec<Uuid>> {
            Ok(self
                .permission_joins
                .lock()
                .await
                .iter()
                .filter(|join| join.tenant_id == tenant_id && join.role_id == role_id)
                .map(|join| join.permission_id)
                .collect())
        }

        async fn apply_permission_diff(
            &self,
            _tenant_id: TenantId,
            _role_id: Uuid,
            _remove_permission_ids: &[Uuid],
            insert: Vec<RolePermissionJoin>,
        ) -> AppResult<()> {
            self.permission_joins.lock().await.extend(insert);
            Ok(())
        }

        async fn find_account_join(
            &self,
            _tenant_id: TenantId,
            _account_id: Uuid,
        ) -> AppResult<Option<RoleAccountJoin>> {
            Ok(None)
        }

        async fn insert_account_join(&self, _join: RoleAccountJoin) -> AppResult<()> {
            Ok(())
        }

        async fn reassign_account_join(
            &self,
            _tenant_id: TenantId,
            _account_id: Uuid,
            _role_id: Uuid,
        ) -> AppResult<()> {
            Ok(())
        }

        async fn delete_account_join(
            &self,
            _tenant_id: TenantId,
            _role_id: Uuid,
            _account_id: Uuid,
        ) -> AppResult<()> {
            Ok(())
        }

        async fn count_account_joins(
            &self,
            _tenant_id: TenantId,
            _role_id: Uuid,
        ) -> AppResult<u64> {
            Ok(0)
        }
    }

    fn actor() -> Actor {
        Actor::new(Uuid::new_v4(), TenantId::new())
    }

    fn permission_row(permission_id: Uuid) -> CatalogRow {
        CatalogRow {
            module_name: "Console".to_owned(),
            sub_module: Some(CatalogSubModule {
                name: "Apps".to_owned(),
                description: "App management".to_owned(),
            }),
            permission: Some(CatalogPermission {
                id: permission_id,
                name: "create app".to_owned(),
                is_superadmin_only: false,
            }),
        }
    }

    #[tokio::test]
    async fn unknown_module_filter_is_not_found() {
        let actor = actor();
        let service = CatalogService::new(
            Arc::new(FakeCatalog {
                module_id: Uuid::new_v4(),
                rows: Vec::new(),
            }),
            Arc::new(FakeRoles::default()),
        );

        let result = service
            .permission_tree(&actor, Some(Uuid::new_v4()), None)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn catalog_view_has_no_selection_flags() {
        let actor = actor();
        let service = CatalogService::new(
            Arc::new(FakeCatalog {
                module_id: Uuid::new_v4(),
                rows: vec![permission_row(Uuid::new_v4())],
            }),
            Arc::new(FakeRoles::default()),
        );

        let tree = service
            .permission_tree(&actor, None, None)
            .await
            .unwrap_or_default();
        assert_eq!(tree[0].sub_modules[0].permissions[0].is_selected, None);
    }

    #[tokio::test]
    async fn role_view_marks_granted_permissions() {
        let actor = actor();
        let granted = Uuid::new_v4();
        let ungranted = Uuid::new_v4();

        let roles = Arc::new(FakeRoles::default());
        let role = Role::create(&actor, "Analyst".to_owned(), "d".to_owned());
        let Ok(role) = role else {
            panic!("role creation failed");
        };
        let inserted = roles.insert_role(role.clone()).await;
        assert!(inserted.is_ok());
        let granted_join = RolePermissionJoin::new(&actor, role.id(), granted);
        let applied = roles
            .apply_permission_diff(actor.tenant_id(), role.id(), &[], vec![granted_join])
            .await;
        assert!(applied.is_ok());

        let service = CatalogService::new(
            Arc::new(FakeCatalog {
                module_id: Uuid::new_v4(),
                rows: vec![permission_row(granted), permission_row(ungranted)],
            }),
            roles,
        );

        let tree = service
            .permission_tree(&actor, None, Some(role.id()))
            .await
            .unwrap_or_default();
        let permissions = &tree[0].sub_modules[0].permissions;
        assert_eq!(permissions[0].is_selected, Some(true));
        assert_eq!(permissions[1].is_selected, Some(false));
    }

    #[tokio::test]
    async fn unknown_role_scope_is_not_found() {
        let actor = actor();
        let service = CatalogService::new(
            Arc::new(FakeCatalog {
                module_id: Uuid::new_v4(),
                rows: Vec::new(),
            }),
            Arc::new(FakeRoles::default()),
        );

        let result = service
            .permission_tree(&actor, None, Some(Uuid::new_v4()))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
