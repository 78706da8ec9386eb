//! Request-level workflows.
//!
//! Each public method runs one transaction: load the rows the operation
//! touches, refresh the principal when the operation asks for it, evaluate
//! the policy, write, commit.

mod auth;
mod comments;
mod directory;
pub mod error;
mod invitations;
mod notifier;
mod tickets;

pub use auth::{AccessTokenClaims, AuthService, JwtService, LoginResult};
pub use comments::{CommentService, NewCommentInput};
pub use directory::{DirectoryService, RegisterOrganizationInput, Registration};
pub use error::{ConflictReason, HelpdeskError};
pub use invitations::{
    AcceptInvitationInput, CreateInvitationInput, InvitationDetails, InvitationService,
    IssuedInvitation,
};
pub use notifier::{InvitationCreated, InvitationNotifier, MockNotifier, TracingNotifier};
pub use tickets::{CreateTicketInput, TicketPage, TicketService, UpdateTicketInput};

use uuid::Uuid;

use crate::models::Ticket;
use crate::policy::{evaluate, Decision, Freshness, Operation, Principal, Scope};
use crate::store::Transaction;

/// The principal a privileged operation should be judged as: the session
/// snapshot, or the user row as it is right now.
async fn resolve_principal(
    tx: &mut dyn Transaction,
    principal: &Principal,
    freshness: Freshness,
) -> Result<Principal, HelpdeskError> {
    match freshness {
        Freshness::Snapshot => Ok(principal.clone()),
        Freshness::Directory => tx
            .find_user(principal.user_id)
            .await?
            .map(|user| Principal::from(&user))
            .ok_or(HelpdeskError::Unauthenticated),
    }
}

fn authorize(
    principal: Option<&Principal>,
    operation: &Operation<'_>,
) -> Result<Scope, HelpdeskError> {
    match evaluate(principal, operation) {
        Decision::Allowed(scope) => Ok(scope),
        Decision::Denied(reason) => {
            tracing::info!(
                operation = %operation.kind(),
                reason = %reason,
                user_id = ?principal.map(|p| p.user_id),
                "Operation denied"
            );
            Err(reason.into())
        }
    }
}

/// Load a ticket and its assignees, or `NotFound`.
async fn load_ticket(
    tx: &mut dyn Transaction,
    ticket_id: Uuid,
) -> Result<(Ticket, Vec<Uuid>), HelpdeskError> {
    let ticket = tx
        .find_ticket(ticket_id)
        .await?
        .ok_or(HelpdeskError::NotFound)?;
    let assignees = tx.ticket_assignees(ticket_id).await?;
    Ok((ticket, assignees))
}

/// Trimmed copy of a required text field.
fn required(field: &str, value: &str) -> Result<String, HelpdeskError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HelpdeskError::Invalid(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}
