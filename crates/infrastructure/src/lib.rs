//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_authz_repository;
mod postgres_catalog_repository;
mod postgres_group_repository;
mod postgres_role_repository;
mod postgres_tag_repository;
mod postgres_target_directory;

pub use in_memory_authz_repository::InMemoryAuthzRepository;
pub use postgres_catalog_repository::PostgresCatalogRepository;
pub use postgres_group_repository::PostgresGroupRepository;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_tag_repository::PostgresTagRepository;
pub use postgres_target_directory::PostgresTargetDirectory;
