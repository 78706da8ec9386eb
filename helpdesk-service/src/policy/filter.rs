//! Residual filters attached to allowed reads and the caller-chosen query
//! options that narrow them further.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    normalize_email, Comment, Invitation, Ticket, TicketPriority, TicketStatus, User,
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Tickets a principal may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFilter {
    pub organization_id: Uuid,
    /// When set, only tickets this user created or is assigned to.
    pub participant: Option<Uuid>,
}

impl TicketFilter {
    pub fn organization(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            participant: None,
        }
    }

    pub fn participant(organization_id: Uuid, user_id: Uuid) -> Self {
        Self {
            organization_id,
            participant: Some(user_id),
        }
    }

    pub fn matches(&self, ticket: &Ticket, assignees: &[Uuid]) -> bool {
        if ticket.organization_id != self.organization_id {
            return false;
        }
        match self.participant {
            None => true,
            Some(user_id) => ticket.user_id == user_id || assignees.contains(&user_id),
        }
    }
}

/// Sort orders offered by the ticket list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketSort {
    #[default]
    CreatedAtDesc,
    CreatedAtAsc,
    UpdatedAtDesc,
    UpdatedAtAsc,
    PriorityDesc,
    PriorityAsc,
}

impl TicketSort {
    /// ORDER BY clause over the `t` alias.
    pub fn order_by_sql(&self) -> &'static str {
        match self {
            TicketSort::CreatedAtDesc => "t.created_at DESC",
            TicketSort::CreatedAtAsc => "t.created_at ASC",
            TicketSort::UpdatedAtDesc => "t.updated_at DESC",
            TicketSort::UpdatedAtAsc => "t.updated_at ASC",
            TicketSort::PriorityDesc => "t.priority DESC, t.created_at DESC",
            TicketSort::PriorityAsc => "t.priority ASC, t.created_at DESC",
        }
    }

    pub fn compare(&self, a: &Ticket, b: &Ticket) -> Ordering {
        match self {
            TicketSort::CreatedAtDesc => b.created_at.cmp(&a.created_at),
            TicketSort::CreatedAtAsc => a.created_at.cmp(&b.created_at),
            TicketSort::UpdatedAtDesc => b.updated_at.cmp(&a.updated_at),
            TicketSort::UpdatedAtAsc => a.updated_at.cmp(&b.updated_at),
            TicketSort::PriorityDesc => b
                .priority
                .cmp(&a.priority)
                .then_with(|| b.created_at.cmp(&a.created_at)),
            TicketSort::PriorityAsc => a
                .priority
                .cmp(&b.priority)
                .then_with(|| b.created_at.cmp(&a.created_at)),
        }
    }
}

/// Caller-chosen narrowing, sort and paging for ticket lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub sort: TicketSort,
    pub page: u32,
    pub page_size: u32,
}

impl Default for TicketQuery {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            sort: TicketSort::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TicketQuery {
    /// Clamp paging into range: page >= 1, 1 <= page_size <= MAX_PAGE_SIZE.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.map_or(true, |s| ticket.status == s)
            && self.priority.map_or(true, |p| ticket.priority == p)
    }
}

/// Comments a principal may see on one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentFilter {
    pub ticket_id: Uuid,
    pub viewer: Uuid,
}

impl CommentFilter {
    pub fn matches(&self, comment: &Comment) -> bool {
        comment.ticket_id == self.ticket_id && (!comment.is_private || comment.user_id == self.viewer)
    }
}

/// Users visible in an organization directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    pub organization_id: Uuid,
    pub ids: Option<Vec<Uuid>>,
}

impl UserFilter {
    pub fn organization(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            ids: None,
        }
    }

    /// Narrow to a set of ids (used to resolve assignees).
    pub fn with_ids(mut self, ids: &[Uuid]) -> Self {
        self.ids = Some(ids.to_vec());
        self
    }

    pub fn matches(&self, user: &User) -> bool {
        user.organization_id == self.organization_id
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&user.id))
    }
}

/// Invitations of one organization, optionally for one email and/or still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationFilter {
    pub organization_id: Uuid,
    pub email: Option<String>,
    /// When set, only unaccepted invitations not yet expired at this instant.
    pub pending_at: Option<DateTime<Utc>>,
}

impl InvitationFilter {
    pub fn pending_for(organization_id: Uuid, email: &str, now: DateTime<Utc>) -> Self {
        Self {
            organization_id,
            email: Some(normalize_email(email)),
            pending_at: Some(now),
        }
    }

    pub fn matches(&self, invitation: &Invitation) -> bool {
        invitation.organization_id == self.organization_id
            && self
                .email
                .as_deref()
                .map_or(true, |e| normalize_email(&invitation.email) == normalize_email(e))
            && self
                .pending_at
                .map_or(true, |now| invitation.is_pending(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTicket;

    fn ticket(org: Uuid, owner: Uuid) -> Ticket {
        Ticket::new(&NewTicket {
            title: "t".to_string(),
            description: "d".to_string(),
            priority: TicketPriority::Medium,
            organization_id: org,
            user_id: owner,
        })
    }

    #[test]
    fn test_participant_filter() {
        let org = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let t = ticket(org, owner);

        assert!(TicketFilter::participant(org, owner).matches(&t, &[]));
        assert!(TicketFilter::participant(org, assignee).matches(&t, &[assignee]));
        assert!(!TicketFilter::participant(org, stranger).matches(&t, &[assignee]));
        assert!(TicketFilter::organization(org).matches(&t, &[]));
        assert!(!TicketFilter::organization(Uuid::new_v4()).matches(&t, &[]));
    }

    #[test]
    fn test_query_paging_is_clamped() {
        let q = TicketQuery {
            page: 0,
            page_size: 1000,
            ..TicketQuery::default()
        }
        .normalized();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, MAX_PAGE_SIZE);
        assert_eq!(q.offset(), 0);

        let q = TicketQuery {
            page: 3,
            page_size: 10,
            ..TicketQuery::default()
        };
        assert_eq!(q.offset(), 20);
    }

    #[test]
    fn test_priority_sort_breaks_ties_by_newest() {
        let org = Uuid::new_v4();
        let mut older = ticket(org, Uuid::new_v4());
        older.created_at -= chrono::Duration::hours(1);
        let newer = ticket(org, Uuid::new_v4());

        assert_eq!(
            TicketSort::PriorityDesc.compare(&newer, &older),
            Ordering::Less
        );
    }
}
