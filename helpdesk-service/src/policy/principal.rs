use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, User};

/// The authenticated identity making a request.
///
/// Built either from session claims (possibly stale) or from a fresh
/// directory read; see [`super::Freshness`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub organization_id: Uuid,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role, organization_id: Uuid) -> Self {
        Self {
            user_id,
            role,
            organization_id,
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role.is_manager()
    }

    pub fn same_tenant(&self, organization_id: Uuid) -> bool {
        self.organization_id == organization_id
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role, user.organization_id)
    }
}
