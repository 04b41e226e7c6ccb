use async_trait::async_trait;
use uuid::Uuid;

use authgraph_core::AppResult;
use authgraph_domain::{CatalogRow, Module};

/// Repository port for the permission catalog.
///
/// The catalog is process-wide reference data, so none of these take a
/// tenant id.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Lists modules newest first.
    async fn list_modules(&self) -> AppResult<Vec<Module>>;

    /// Returns whether a module exists.
    async fn module_exists(&self, module_id: Uuid) -> AppResult<bool>;

    /// Returns whether a permission exists.
    async fn permission_exists(&self, permission_id: Uuid) -> AppResult<bool>;

    /// Lists the ids of every permission under a module.
    async fn list_permission_ids_for_module(&self, module_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Lists the Module ⟕ SubModule ⟕ Permission outer join, ordered by
    /// module creation time newest first, optionally restricted to one
    /// module.
    async fn list_catalog_rows(&self, module_id: Option<Uuid>) -> AppResult<Vec<CatalogRow>>;
}
