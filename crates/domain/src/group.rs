use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use authgraph_core::{Actor, AppResult, EntityName, TenantId};

/// A tenant-scoped group that owns bindings to other entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: Uuid,
    tenant_id: TenantId,
    name: EntityName,
    agency_name: EntityName,
    description: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl Group {
    /// Creates a new group with validated names, stamped with the actor.
    pub fn create(
        actor: &Actor,
        name: impl Into<String>,
        agency_name: impl Into<String>,
        description: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id: actor.tenant_id(),
            name: EntityName::new(name)?,
            agency_name: EntityName::new(agency_name)?,
            description: description.into(),
            created_by: actor.account_id(),
            created_at: Utc::now(),
        })
    }

    /// Rehydrates a group from stored fields.
    #[must_use]
    pub fn from_storage(
        id: Uuid,
        tenant_id: TenantId,
        name: EntityName,
        agency_name: EntityName,
        description: String,
        created_by: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            name,
            agency_name,
            description,
            created_by,
            created_at,
        }
    }

    /// Replaces the editable fields with validated values.
    pub fn apply_update(
        &mut self,
        name: impl Into<String>,
        agency_name: impl Into<String>,
        description: impl Into<String>,
    ) -> AppResult<()> {
        self.name = EntityName::new(name)?;
        self.agency_name = EntityName::new(agency_name)?;
        self.description = description.into();
        Ok(())
    }

    /// Returns the stable group identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &EntityName {
        &self.name
    }

    /// Returns the agency name.
    #[must_use]
    pub fn agency_name(&self) -> &EntityName {
        &self.agency_name
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
