//! HTTP handlers for helpdesk-service.
//!
//! Handlers only translate: request DTO in, service call, response DTO out.
//! Every status code decision lives in the `HelpdeskError` conversion below.

pub mod auth;
pub mod comments;
pub mod health;
pub mod invitations;
pub mod tickets;
pub mod users;

pub use auth::*;
pub use comments::*;
pub use health::*;
pub use invitations::*;
pub use tickets::*;
pub use users::*;

use service_core::error::AppError;

use crate::policy::DenyReason;
use crate::services::HelpdeskError;
use crate::store::StoreError;

/// Denials that describe a bad request rather than a missing permission.
fn is_input_denial(reason: DenyReason) -> bool {
    matches!(
        reason,
        DenyReason::InvalidStatus
            | DenyReason::InvalidParent
            | DenyReason::UnknownAssignee
            | DenyReason::AlreadyAccepted
            | DenyReason::Expired
            | DenyReason::EmailMismatch
    )
}

impl From<HelpdeskError> for AppError {
    fn from(err: HelpdeskError) -> Self {
        let code = anyhow::anyhow!("{}", err.code());
        match err {
            HelpdeskError::Unauthenticated => AppError::Unauthorized(code),
            HelpdeskError::NotFound => AppError::NotFound(code),
            HelpdeskError::Conflict(_) => AppError::Conflict(code),
            HelpdeskError::Invalid(message) => {
                tracing::debug!(%message, "Rejected input");
                AppError::BadRequest(code)
            }
            HelpdeskError::Denied(reason) if is_input_denial(reason) => AppError::BadRequest(code),
            HelpdeskError::Denied(_) => AppError::Forbidden(code),
            HelpdeskError::Storage(StoreError::Unavailable) => AppError::ServiceUnavailable,
            HelpdeskError::Storage(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            HelpdeskError::Internal(e) => AppError::InternalError(e),
        }
    }
}
