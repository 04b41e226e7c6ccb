use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TenantId;

/// Identity context for the caller of a mutating operation.
///
/// Authentication happens outside this subsystem; callers hand in the
/// resolved account and tenant, which become the `created_by` and
/// `tenant_id` stamps on every written row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    account_id: Uuid,
    tenant_id: TenantId,
}

impl Actor {
    /// Creates an actor from a resolved account and tenant.
    #[must_use]
    pub fn new(account_id: Uuid, tenant_id: TenantId) -> Self {
        Self {
            account_id,
            tenant_id,
        }
    }

    /// Returns the acting account identifier.
    #[must_use]
    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    /// Returns the tenant the actor operates in.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
