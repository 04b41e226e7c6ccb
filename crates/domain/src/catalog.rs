use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top level of the permission catalog. Process-wide, not tenant-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Stable module identifier.
    pub id: Uuid,
    /// Module display name.
    pub name: String,
    /// Creation timestamp, drives catalog ordering (newest first).
    pub created_at: DateTime<Utc>,
}

/// Second catalog level, unique per (name, module).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubModule {
    /// Stable submodule identifier.
    pub id: Uuid,
    /// Owning module.
    pub module_id: Uuid,
    /// Submodule display name.
    pub name: String,
    /// Submodule description.
    pub description: String,
}

/// A grantable permission, leaf of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable permission identifier.
    pub id: Uuid,
    /// Owning submodule.
    pub sub_module_id: Uuid,
    /// Stable code, unique per submodule.
    pub code: String,
    /// Permission display name.
    pub name: String,
    /// Restricts the permission to superadmin roles.
    pub is_superadmin_only: bool,
}

/// Submodule columns of an outer-join catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSubModule {
    /// Submodule display name.
    pub name: String,
    /// Submodule description.
    pub description: String,
}

/// Permission columns of an outer-join catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPermission {
    /// Stable permission identifier.
    pub id: Uuid,
    /// Permission display name.
    pub name: String,
    /// Restricts the permission to superadmin roles.
    pub is_superadmin_only: bool,
}

/// One row of the Module ⟕ SubModule ⟕ Permission outer join.
///
/// Rows arrive ordered by module creation time (newest first). A module
/// with no submodules yields a row with both optional parts absent; a
/// submodule with no permissions yields a row with only the permission
/// absent. The aggregator must keep both as empty containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    /// Module display name.
    pub module_name: String,
    /// Joined submodule, when the module has one.
    pub sub_module: Option<CatalogSubModule>,
    /// Joined permission, when the submodule has one.
    pub permission: Option<CatalogPermission>,
}

/// Permission leaf of the aggregated tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    /// Stable permission identifier.
    pub id: Uuid,
    /// Permission display name.
    pub name: String,
    /// Restricts the permission to superadmin roles.
    pub is_superadmin_only: bool,
    /// Whether the scoping role holds this permission. Omitted entirely in
    /// catalog views so consumers can tell them apart from role views.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_selected: Option<bool>,
}

/// Submodule node of the aggregated tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubModuleNode {
    /// Submodule display name.
    pub name: String,
    /// Submodule description.
    pub description: String,
    /// Permissions under this submodule, possibly empty.
    pub permissions: Vec<PermissionEntry>,
}

/// Module node of the aggregated tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleNode {
    /// Module display name.
    pub name: String,
    /// Submodules under this module, possibly empty.
    pub sub_modules: Vec<SubModuleNode>,
}

/// Folds flat outer-join rows into the nested permission catalog.
///
/// Modules and submodules are keyed by name with first occurrence winning
/// insertion order, so the incoming row order decides the tree order. When
/// `selected` is supplied the fold emits `is_selected` per permission;
/// otherwise the flag stays absent.
#[must_use]
pub fn build_permission_tree(
    rows: &[CatalogRow],
    selected: Option<&HashSet<Uuid>>,
) -> Vec<ModuleNode> {
    let mut modules: Vec<ModuleNode> = Vec::new();

    for row in rows {
        let module = match modules
            .iter_mut()
            .position(|node| node.name == row.module_name)
        {
            Some(index) => &mut modules[index],
            None => {
                modules.push(ModuleNode {
                    name: row.module_name.clone(),
                    sub_modules: Vec::new(),
                });
                let last = modules.len() - 1;
                &mut modules[last]
            }
        };

        let Some(sub_module_row) = &row.sub_module else {
            continue;
        };

        let sub_module = match module
            .sub_modules
            .iter_mut()
            .position(|node| node.name == sub_module_row.name)
        {
            Some(index) => &mut module.sub_modules[index],
            None => {
                module.sub_modules.push(SubModuleNode {
                    name: sub_module_row.name.clone(),
                    description: sub_module_row.description.clone(),
                    permissions: Vec::new(),
                });
                let last = module.sub_modules.len() - 1;
                &mut module.sub_modules[last]
            }
        };

        if let Some(permission) = &row.permission {
            sub_module.permissions.push(PermissionEntry {
                id: permission.id,
                name: permission.name.clone(),
                is_superadmin_only: permission.is_superadmin_only,
                is_selected: selected.map(|set| set.contains(&permission.id)),
            });
        }
    }

    modules
}
