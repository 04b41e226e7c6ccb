use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use authgraph_core::{Actor, AppResult, EntityName, TenantId};

/// Fixed role names that are never counted or listed per group.
///
/// These two roles exist in every tenant and stay hidden from per-group
/// role counts regardless of their binding state.
pub const SUPERUSER_ROLE_NAMES: [&str; 2] = ["Superadministrator", "System Operator"];

/// A tenant-scoped role.
///
/// A role is either bound to exactly one group via a group binding of kind
/// `role`, or unbound and therefore visible to every group in the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: Uuid,
    tenant_id: TenantId,
    name: EntityName,
    description: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl Role {
    /// Creates a new role with a validated name, stamped with the actor.
    pub fn create(
        actor: &Actor,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id: actor.tenant_id(),
            name: EntityName::new(name)?,
            description: description.into(),
            created_by: actor.account_id(),
            created_at: Utc::now(),
        })
    }

    /// Rehydrates a role from stored fields.
    #[must_use]
    pub fn from_storage(
        id: Uuid,
        tenant_id: TenantId,
        name: EntityName,
        description: String,
        created_by: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            name,
            description,
            created_by,
            created_at,
        }
    }

    /// Replaces the editable fields with validated values.
    pub fn apply_update(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> AppResult<()> {
        self.name = EntityName::new(name)?;
        self.description = description.into();
        Ok(())
    }

    /// Returns whether a role name belongs to the fixed superuser set.
    #[must_use]
    pub fn is_superuser_name(name: &str) -> bool {
        SUPERUSER_ROLE_NAMES.contains(&name)
    }

    /// Returns the stable role identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &EntityName {
        &self.name
    }

    /// Returns the free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the creating account.
    #[must_use]
    pub fn created_by(&self) -> Uuid {
        self.created_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Many-to-many association between a role and a catalog permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionJoin {
    /// Stable join identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Granted role.
    pub role_id: Uuid,
    /// Granted permission.
    pub permission_id: Uuid,
}

impl RolePermissionJoin {
    /// Creates a new join row in the actor's tenant.
    #[must_use]
    pub fn new(actor: &Actor, role_id: Uuid, permission_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: actor.tenant_id(),
            role_id,
            permission_id,
        }
    }
}

/// Association between a role and an account.
///
/// Despite the table shape, an account holds at most one role at a time:
/// attach skips accounts that already hold any role, and reassignment
/// updates the existing row in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAccountJoin {
    /// Stable join identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Held role.
    pub role_id: Uuid,
    /// Holding account.
    pub account_id: Uuid,
    /// Account that created the join.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl RoleAccountJoin {
    /// Creates a new join row stamped with the actor's identity.
    #[must_use]
    pub fn new(actor: &Actor, role_id: Uuid, account_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: actor.tenant_id(),
            role_id,
            account_id,
            created_by: actor.account_id(),
            created_at: Utc::now(),
        }
    }
}

/// Sort rank for roles when resolving default visibility.
///
/// Unbound roles are global and sort first; roles bound to the requested
/// group follow; roles bound to other groups rank last and are excluded
/// from group-filtered listings.
#[must_use]
pub fn group_visibility_rank(binding_group: Option<Uuid>, requested_group: Option<Uuid>) -> u8 {
    match (binding_group, requested_group) {
        (None, _) => 0,
        (Some(bound), Some(requested)) if bound == requested => 1,
        (Some(_), None) => 1,
        _ => 2,
    }
}
