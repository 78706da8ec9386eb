use thiserror::Error;

use crate::policy::DenyReason;
use crate::store::StoreError;

/// Uniqueness rules that can fail at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    EmailAlreadyExists,
    PendingInvitationExists,
}

impl ConflictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictReason::EmailAlreadyExists => "email_already_exists",
            ConflictReason::PendingInvitationExists => "pending_invitation_exists",
        }
    }
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum HelpdeskError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Denied: {0}")]
    Denied(DenyReason),

    #[error("Not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HelpdeskError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &str {
        match self {
            HelpdeskError::Unauthenticated => "unauthenticated",
            HelpdeskError::Denied(reason) => reason.as_str(),
            HelpdeskError::NotFound => "not_found",
            HelpdeskError::Conflict(reason) => reason.as_str(),
            HelpdeskError::Invalid(_) => "invalid_input",
            HelpdeskError::Storage(_) | HelpdeskError::Internal(_) => "internal_error",
        }
    }

    /// Translate a write-time store conflict into the rule it broke.
    pub fn from_store_conflict(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) if reason == "email_already_exists" => {
                HelpdeskError::Conflict(ConflictReason::EmailAlreadyExists)
            }
            StoreError::Conflict(reason) if reason == "already_accepted" => {
                HelpdeskError::Denied(DenyReason::AlreadyAccepted)
            }
            other => HelpdeskError::Storage(other),
        }
    }
}

impl From<DenyReason> for HelpdeskError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotFound => HelpdeskError::NotFound,
            DenyReason::Unauthenticated => HelpdeskError::Unauthenticated,
            DenyReason::EmailAlreadyExists => {
                HelpdeskError::Conflict(ConflictReason::EmailAlreadyExists)
            }
            DenyReason::PendingInvitationExists => {
                HelpdeskError::Conflict(ConflictReason::PendingInvitationExists)
            }
            other => HelpdeskError::Denied(other),
        }
    }
}
