use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use authgraph_core::{Actor, AppError, AppResult, EntityName, TenantId};

/// Kind of entity a tag may label.
///
/// Tags never label roles, so this is a narrower closed set than
/// [`crate::BindingKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagTargetKind {
    /// A knowledge dataset owned by the tenant.
    Knowledge,
    /// An app owned by the tenant.
    App,
    /// An active tenant-account membership.
    User,
}

impl TagTargetKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knowledge => "knowledge",
            Self::App => "app",
            Self::User => "user",
        }
    }

    /// Returns the human-readable noun used in not-found errors.
    #[must_use]
    pub fn target_noun(&self) -> &'static str {
        match self {
            Self::Knowledge => "dataset",
            Self::App => "app",
            Self::User => "tenant member",
        }
    }
}

impl FromStr for TagTargetKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "knowledge" => Ok(Self::Knowledge),
            "app" => Ok(Self::App),
            "user" => Ok(Self::User),
            _ => Err(AppError::Validation(format!(
                "unknown tag target type '{value}'"
            ))),
        }
    }
}

impl Display for TagTargetKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

/// A tenant-scoped label applicable to targets of one kind.
///
/// Tag names are unique case-insensitively within (tenant, kind).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    id: Uuid,
    tenant_id: TenantId,
    kind: TagTargetKind,
    name: EntityName,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl Tag {
    /// Creates a new tag with a validated name, stamped with the actor.
    pub fn create(
        actor: &Actor,
        kind: TagTargetKind,
        name: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id: actor.tenant_id(),
            kind,
            name: EntityName::new(name)?,
            created_by: actor.account_id(),
            created_at: Utc::now(),
        })
    }

    /// Rehydrates a tag from stored fields.
    #[must_use]
    pub fn from_storage(
        id: Uuid,
        tenant_id: TenantId,
        kind: TagTargetKind,
        name: EntityName,
        created_by: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            kind,
            name,
            created_by,
            created_at,
        }
    }

    /// Renames the tag with a validated value.
    pub fn rename(&mut self, name: impl Into<String>) -> AppResult<()> {
        self.name = EntityName::new(name)?;
        Ok(())
    }

    /// Returns the stable tag identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the kind of target this tag labels.
    #[must_use]
    pub fn kind(&self) -> TagTargetKind {
        self.kind
    }

    /// Returns the tag name.
    #[must_use]
    pub fn name(&self) -> &EntityName {
        &self.name
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

/// Attachment of a tag to a target.
///
/// Non-exclusive: a target may carry many tags and a tag may label many
/// targets. Uniqueness holds per (tag, target) pair only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagBinding {
    /// Stable binding identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Attached tag.
    pub tag_id: Uuid,
    /// Labeled target.
    pub target_id: Uuid,
    /// Kind of the labeled target.
    pub kind: TagTargetKind,
    /// Account that created the binding.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TagBinding {
    /// Creates a new binding row stamped with the actor's identity.
    #[must_use]
    pub fn new(actor: &Actor, tag_id: Uuid, target_id: Uuid, kind: TagTargetKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: actor.tenant_id(),
            tag_id,
            target_id,
            kind,
            created_by: actor.account_id(),
            created_at: Utc::now(),
        }
    }
}
