use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use authgraph_core::{Actor, AppError, TenantId};

/// Kind of entity a group binding may attach to a group.
///
/// A closed set: an unrecognized tag is rejected when parsed, it never
/// reaches the validation or mutation paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// A knowledge dataset owned by the tenant.
    Knowledge,
    /// An app owned by the tenant.
    App,
    /// An active tenant-account membership.
    User,
    /// A role owned by the tenant.
    Role,
}

impl BindingKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knowledge => "knowledge",
            Self::App => "app",
            Self::User => "user",
            Self::Role => "role",
        }
    }

    /// Returns the human-readable noun used in not-found errors.
    #[must_use]
    pub fn target_noun(&self) -> &'static str {
        match self {
            Self::Knowledge => "dataset",
            Self::App => "app",
            Self::User => "tenant member",
            Self::Role => "role",
        }
    }
}

impl FromStr for BindingKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "knowledge" => Ok(Self::Knowledge),
            "app" => Ok(Self::App),
            "user" => Ok(Self::User),
            "role" => Ok(Self::Role),
            _ => Err(AppError::Validation(format!(
                "unknown binding type '{value}'"
            ))),
        }
    }
}

impl Display for BindingKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

/// Attachment of a target entity to a group.
///
/// For non-role kinds a target is bound to at most one group across the
/// tenant; attach logic enforces this by probing for any existing binding
/// before inserting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBinding {
    /// Stable binding identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Group the target is attached to.
    pub group_id: Uuid,
    /// Identifier of the bound target.
    pub target_id: Uuid,
    /// Kind of the bound target.
    pub kind: BindingKind,
    /// Account that created the binding.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl GroupBinding {
    /// Creates a new binding row stamped with the actor's identity.
    #[must_use]
    pub fn new(actor: &Actor, group_id: Uuid, target_id: Uuid, kind: BindingKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: actor.tenant_id(),
            group_id,
            target_id,
            kind,
            created_by: actor.account_id(),
            created_at: Utc::now(),
        }
    }
}

/// Computed difference between a currently bound set and a requested set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingDiff {
    /// Targets present in the request but not currently bound.
    pub to_add: Vec<Uuid>,
    /// Targets currently bound but absent from the request.
    pub to_remove: Vec<Uuid>,
}

impl BindingDiff {
    /// Returns whether applying the diff would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Computes the symmetric difference driving every replace operation.
///
/// Members of the intersection are left untouched, so a replace with the
/// current set is a no-op. Duplicates in the request are collapsed and the
/// request's order is preserved for additions.
#[must_use]
pub fn replace_diff(current: &[Uuid], requested: &[Uuid]) -> BindingDiff {
    let current_set: HashSet<Uuid> = current.iter().copied().collect();
    let requested_set: HashSet<Uuid> = requested.iter().copied().collect();

    let mut seen = HashSet::new();
    let to_add = requested
        .iter()
        .copied()
        .filter(|id| seen.insert(*id) && !current_set.contains(id))
        .collect();

    let to_remove = current
        .iter()
        .copied()
        .filter(|id| !requested_set.contains(id))
        .collect();

    BindingDiff { to_add, to_remove }
}
