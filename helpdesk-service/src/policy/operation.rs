use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Comment, Invitation, Ticket, User};

/// A ticket row together with its current assignee ids.
#[derive(Debug, Clone, Copy)]
pub struct TicketSnapshot<'a> {
    pub ticket: &'a Ticket,
    pub assignees: &'a [Uuid],
}

impl<'a> TicketSnapshot<'a> {
    pub fn new(ticket: &'a Ticket, assignees: &'a [Uuid]) -> Self {
        Self { ticket, assignees }
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.ticket.user_id == user_id
    }

    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assignees.contains(&user_id)
    }
}

/// Requested assignee ids and the users the directory resolved for them.
#[derive(Debug, Clone, Copy)]
pub struct AssigneeCheck<'a> {
    pub requested: &'a [Uuid],
    pub resolved: &'a [User],
}

impl<'a> AssigneeCheck<'a> {
    pub fn new(requested: &'a [Uuid], resolved: &'a [User]) -> Self {
        Self {
            requested,
            resolved,
        }
    }

    /// Every requested id names an existing user of `organization_id`.
    pub fn all_known(&self, organization_id: Uuid) -> bool {
        self.requested.iter().all(|id| {
            self.resolved
                .iter()
                .any(|u| u.id == *id && u.organization_id == organization_id)
        })
    }
}

/// The parent a new reply points at, and what the store found under that id.
#[derive(Debug, Clone, Copy)]
pub struct ParentRef<'a> {
    pub id: Uuid,
    pub found: Option<&'a Comment>,
}

/// Whether the principal snapshot from the session is good enough, or the
/// service must re-read the user row before evaluating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Snapshot,
    Directory,
}

/// Closed set of things a caller can ask to do.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    RegisterOrganization {
        email_taken: bool,
    },
    CreateTicket {
        assignees: AssigneeCheck<'a>,
    },
    ViewTicket {
        ticket: TicketSnapshot<'a>,
    },
    UpdateTicketFields {
        ticket: TicketSnapshot<'a>,
    },
    UpdateTicketStatus {
        ticket: TicketSnapshot<'a>,
        status: &'a str,
    },
    DeleteTicket {
        ticket: TicketSnapshot<'a>,
    },
    AssignTicket {
        ticket: TicketSnapshot<'a>,
        assignees: AssigneeCheck<'a>,
    },
    ListTickets,
    CreateComment {
        ticket: TicketSnapshot<'a>,
        parent: Option<ParentRef<'a>>,
    },
    EditComment {
        ticket: TicketSnapshot<'a>,
        comment: &'a Comment,
    },
    DeleteComment {
        ticket: TicketSnapshot<'a>,
        comment: &'a Comment,
    },
    ListComments {
        ticket: TicketSnapshot<'a>,
    },
    CreateInvitation {
        organization_id: Uuid,
        email_taken: bool,
        pending_exists: bool,
    },
    ValidateInvitation {
        invitation: Option<&'a Invitation>,
        now: DateTime<Utc>,
    },
    AcceptInvitation {
        invitation: Option<&'a Invitation>,
        email: &'a str,
        email_taken: bool,
        now: DateTime<Utc>,
    },
    ListOrgUsers,
}

/// Payload-free name of an [`Operation`], for logs and spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    RegisterOrganization,
    CreateTicket,
    ViewTicket,
    UpdateTicketFields,
    UpdateTicketStatus,
    DeleteTicket,
    AssignTicket,
    ListTickets,
    CreateComment,
    EditComment,
    DeleteComment,
    ListComments,
    CreateInvitation,
    ValidateInvitation,
    AcceptInvitation,
    ListOrgUsers,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::RegisterOrganization => "register_organization",
            OperationKind::CreateTicket => "create_ticket",
            OperationKind::ViewTicket => "view_ticket",
            OperationKind::UpdateTicketFields => "update_ticket_fields",
            OperationKind::UpdateTicketStatus => "update_ticket_status",
            OperationKind::DeleteTicket => "delete_ticket",
            OperationKind::AssignTicket => "assign_ticket",
            OperationKind::ListTickets => "list_tickets",
            OperationKind::CreateComment => "create_comment",
            OperationKind::EditComment => "edit_comment",
            OperationKind::DeleteComment => "delete_comment",
            OperationKind::ListComments => "list_comments",
            OperationKind::CreateInvitation => "create_invitation",
            OperationKind::ValidateInvitation => "validate_invitation",
            OperationKind::AcceptInvitation => "accept_invitation",
            OperationKind::ListOrgUsers => "list_org_users",
        }
    }

    /// Operations open to callers without a session.
    pub fn is_anonymous(&self) -> bool {
        matches!(
            self,
            OperationKind::RegisterOrganization
                | OperationKind::ValidateInvitation
                | OperationKind::AcceptInvitation
        )
    }

    /// Privileged operations evaluate against a freshly read user row.
    pub fn freshness(&self) -> Freshness {
        match self {
            OperationKind::CreateInvitation | OperationKind::UpdateTicketStatus => {
                Freshness::Directory
            }
            _ => Freshness::Snapshot,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operation<'_> {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::RegisterOrganization { .. } => OperationKind::RegisterOrganization,
            Operation::CreateTicket { .. } => OperationKind::CreateTicket,
            Operation::ViewTicket { .. } => OperationKind::ViewTicket,
            Operation::UpdateTicketFields { .. } => OperationKind::UpdateTicketFields,
            Operation::UpdateTicketStatus { .. } => OperationKind::UpdateTicketStatus,
            Operation::DeleteTicket { .. } => OperationKind::DeleteTicket,
            Operation::AssignTicket { .. } => OperationKind::AssignTicket,
            Operation::ListTickets => OperationKind::ListTickets,
            Operation::CreateComment { .. } => OperationKind::CreateComment,
            Operation::EditComment { .. } => OperationKind::EditComment,
            Operation::DeleteComment { .. } => OperationKind::DeleteComment,
            Operation::ListComments { .. } => OperationKind::ListComments,
            Operation::CreateInvitation { .. } => OperationKind::CreateInvitation,
            Operation::ValidateInvitation { .. } => OperationKind::ValidateInvitation,
            Operation::AcceptInvitation { .. } => OperationKind::AcceptInvitation,
            Operation::ListOrgUsers => OperationKind::ListOrgUsers,
        }
    }

    pub fn freshness(&self) -> Freshness {
        self.kind().freshness()
    }
}
