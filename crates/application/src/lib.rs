//! Application services and ports for the authorization graph.

#![forbid(unsafe_code)]

mod catalog_ports;
mod catalog_service;
mod directory;
mod group_ports;
mod group_service;
mod role_ports;
mod role_service;
mod tag_ports;
mod tag_service;

pub use catalog_ports::CatalogRepository;
pub use catalog_service::CatalogService;
pub use directory::{TargetDirectory, ensure_tag_targets_exist, ensure_targets_exist};
pub use group_ports::{
    CreateGroupInput, GroupListQuery, GroupPage, GroupRepository, UpdateGroupInput,
};
pub use group_service::GroupService;
pub use role_ports::{CreateRoleInput, RoleOverview, RoleRepository, UpdateRoleInput};
pub use role_service::RoleService;
pub use tag_ports::{TagOverview, TagRepository};
pub use tag_service::TagService;
