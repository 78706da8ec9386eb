use serde::Serialize;

use super::filter::{CommentFilter, TicketFilter, UserFilter};
use uuid::Uuid;

/// Why an operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Unauthenticated,
    /// Absent, or belonging to another organization.
    NotFound,
    NotOwner,
    NotManager,
    CrossTenant,
    UnknownAssignee,
    InvalidParent,
    InvalidStatus,
    AlreadyAccepted,
    Expired,
    EmailMismatch,
    EmailAlreadyExists,
    PendingInvitationExists,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::NotFound => "not_found",
            DenyReason::NotOwner => "not_owner",
            DenyReason::NotManager => "not_manager",
            DenyReason::CrossTenant => "cross_tenant",
            DenyReason::UnknownAssignee => "unknown_assignee",
            DenyReason::InvalidParent => "invalid_parent",
            DenyReason::InvalidStatus => "invalid_status",
            DenyReason::AlreadyAccepted => "already_accepted",
            DenyReason::Expired => "expired",
            DenyReason::EmailMismatch => "email_mismatch",
            DenyReason::EmailAlreadyExists => "email_already_exists",
            DenyReason::PendingInvitationExists => "pending_invitation_exists",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an allowed operation may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The specific row(s) named in the operation.
    Row,
    /// New rows, always stamped with this organization.
    Tenant(Uuid),
    Tickets(TicketFilter),
    Comments(CommentFilter),
    Users(UserFilter),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed(Scope),
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }

    pub fn into_result(self) -> Result<Scope, DenyReason> {
        match self {
            Decision::Allowed(scope) => Ok(scope),
            Decision::Denied(reason) => Err(reason),
        }
    }
}

impl From<Result<Scope, DenyReason>> for Decision {
    fn from(result: Result<Scope, DenyReason>) -> Self {
        match result {
            Ok(scope) => Decision::Allowed(scope),
            Err(reason) => Decision::Denied(reason),
        }
    }
}
