use chrono::{DateTime, Utc};

use super::decision::{Decision, DenyReason, Scope};
use super::filter::{CommentFilter, TicketFilter, UserFilter};
use super::operation::{Operation, ParentRef, TicketSnapshot};
use super::principal::Principal;
use crate::models::{
    normalize_email, Comment, Invitation, InvitationState, TicketStatus,
};

/// Decide whether `principal` may perform `operation`.
///
/// Pure: no I/O, no clock. Anything time-dependent arrives inside the
/// operation. Anonymous callers are only let through for registration and
/// the invitation endpoints.
pub fn evaluate(principal: Option<&Principal>, operation: &Operation<'_>) -> Decision {
    let result = match operation {
        Operation::RegisterOrganization { email_taken } => register(*email_taken),
        Operation::ValidateInvitation { invitation, now } => {
            invitation_usable(*invitation, *now).map(|_| Scope::Row)
        }
        Operation::AcceptInvitation {
            invitation,
            email,
            email_taken,
            now,
        } => accept(*invitation, email, *email_taken, *now),
        _ => match principal {
            Some(principal) => decide(principal, operation),
            None => Err(DenyReason::Unauthenticated),
        },
    };
    Decision::from(result)
}

fn decide(p: &Principal, operation: &Operation<'_>) -> Result<Scope, DenyReason> {
    match operation {
        Operation::CreateTicket { assignees } => {
            if !assignees.all_known(p.organization_id) {
                return Err(DenyReason::UnknownAssignee);
            }
            Ok(Scope::Tenant(p.organization_id))
        }
        Operation::ViewTicket { ticket } => {
            visible(p, ticket)?;
            Ok(Scope::Row)
        }
        Operation::UpdateTicketFields { ticket } | Operation::DeleteTicket { ticket } => {
            visible(p, ticket)?;
            owner(p, ticket)?;
            Ok(Scope::Row)
        }
        Operation::UpdateTicketStatus { ticket, status } => {
            visible(p, ticket)?;
            if !(ticket.is_owner(p.user_id) || ticket.is_assignee(p.user_id) || p.is_manager()) {
                return Err(DenyReason::NotOwner);
            }
            TicketStatus::parse(status).ok_or(DenyReason::InvalidStatus)?;
            Ok(Scope::Row)
        }
        Operation::AssignTicket { ticket, assignees } => {
            visible(p, ticket)?;
            owner(p, ticket)?;
            if !assignees.all_known(ticket.ticket.organization_id) {
                return Err(DenyReason::UnknownAssignee);
            }
            Ok(Scope::Row)
        }
        Operation::ListTickets => Ok(Scope::Tickets(if p.is_manager() {
            TicketFilter::organization(p.organization_id)
        } else {
            TicketFilter::participant(p.organization_id, p.user_id)
        })),
        Operation::CreateComment { ticket, parent } => {
            visible(p, ticket)?;
            if let Some(parent) = parent {
                valid_parent(p, ticket, parent)?;
            }
            Ok(Scope::Row)
        }
        Operation::EditComment { ticket, comment }
        | Operation::DeleteComment { ticket, comment } => {
            visible(p, ticket)?;
            comment_visible(p, ticket, comment)?;
            if comment.user_id != p.user_id {
                return Err(DenyReason::NotOwner);
            }
            Ok(Scope::Row)
        }
        Operation::ListComments { ticket } => {
            visible(p, ticket)?;
            Ok(Scope::Comments(CommentFilter {
                ticket_id: ticket.ticket.id,
                viewer: p.user_id,
            }))
        }
        Operation::CreateInvitation {
            organization_id,
            email_taken,
            pending_exists,
        } => {
            if !p.same_tenant(*organization_id) {
                return Err(DenyReason::CrossTenant);
            }
            if !p.is_manager() {
                return Err(DenyReason::NotManager);
            }
            if *email_taken {
                return Err(DenyReason::EmailAlreadyExists);
            }
            if *pending_exists {
                return Err(DenyReason::PendingInvitationExists);
            }
            Ok(Scope::Tenant(*organization_id))
        }
        Operation::ListOrgUsers => Ok(Scope::Users(UserFilter::organization(p.organization_id))),
        Operation::RegisterOrganization { .. }
        | Operation::ValidateInvitation { .. }
        | Operation::AcceptInvitation { .. } => Err(DenyReason::Unauthenticated),
    }
}

fn visible(p: &Principal, ticket: &TicketSnapshot<'_>) -> Result<(), DenyReason> {
    if p.same_tenant(ticket.ticket.organization_id) {
        Ok(())
    } else {
        Err(DenyReason::NotFound)
    }
}

fn owner(p: &Principal, ticket: &TicketSnapshot<'_>) -> Result<(), DenyReason> {
    if ticket.is_owner(p.user_id) {
        Ok(())
    } else {
        Err(DenyReason::NotOwner)
    }
}

/// A comment addressed through the wrong ticket, or someone else's private
/// note, does not exist as far as the caller is concerned.
fn comment_visible(
    p: &Principal,
    ticket: &TicketSnapshot<'_>,
    comment: &Comment,
) -> Result<(), DenyReason> {
    if comment.ticket_id != ticket.ticket.id {
        return Err(DenyReason::NotFound);
    }
    if comment.is_private && comment.user_id != p.user_id {
        return Err(DenyReason::NotFound);
    }
    Ok(())
}

fn valid_parent(
    p: &Principal,
    ticket: &TicketSnapshot<'_>,
    parent: &ParentRef<'_>,
) -> Result<(), DenyReason> {
    let found = parent.found.ok_or(DenyReason::InvalidParent)?;
    if found.id != parent.id
        || found.ticket_id != ticket.ticket.id
        || !found.is_top_level()
        || (found.is_private && found.user_id != p.user_id)
    {
        return Err(DenyReason::InvalidParent);
    }
    Ok(())
}

fn register(email_taken: bool) -> Result<Scope, DenyReason> {
    if email_taken {
        Err(DenyReason::EmailAlreadyExists)
    } else {
        Ok(Scope::Row)
    }
}

fn invitation_usable<'a>(
    invitation: Option<&'a Invitation>,
    now: DateTime<Utc>,
) -> Result<&'a Invitation, DenyReason> {
    let invitation = invitation.ok_or(DenyReason::NotFound)?;
    match invitation.state(now) {
        InvitationState::Accepted => Err(DenyReason::AlreadyAccepted),
        InvitationState::Expired => Err(DenyReason::Expired),
        InvitationState::Pending => Ok(invitation),
    }
}

fn accept(
    invitation: Option<&Invitation>,
    email: &str,
    email_taken: bool,
    now: DateTime<Utc>,
) -> Result<Scope, DenyReason> {
    let invitation = invitation_usable(invitation, now)?;
    if normalize_email(&invitation.email) != normalize_email(email) {
        return Err(DenyReason::EmailMismatch);
    }
    if email_taken {
        return Err(DenyReason::EmailAlreadyExists);
    }
    Ok(Scope::Tenant(invitation.organization_id))
}
