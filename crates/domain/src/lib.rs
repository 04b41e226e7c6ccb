//! Domain entities and invariants for the authorization graph.

#![forbid(unsafe_code)]

mod binding;
mod catalog;
mod group;
mod role;
mod tag;

pub use binding::{BindingDiff, BindingKind, GroupBinding, replace_diff};
pub use catalog::{
    CatalogPermission, CatalogRow, CatalogSubModule, Module, ModuleNode, Permission,
    PermissionEntry, SubModule, SubModuleNode, build_permission_tree,
};
pub use group::Group;
pub use role::{
    Role, RoleAccountJoin, RolePermissionJoin, SUPERUSER_ROLE_NAMES, group_visibility_rank,
};
pub use tag::{Tag, TagBinding, TagTargetKind};
