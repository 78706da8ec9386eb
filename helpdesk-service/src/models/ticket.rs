//! Ticket model - support requests raised inside an organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Ticket lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "ticket_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "OPEN",
            TicketStatus::InProgress => "IN_PROGRESS",
            TicketStatus::Closed => "CLOSED",
        }
    }

    /// Parse a wire value. Only the three exact spellings are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(TicketStatus::Open),
            "IN_PROGRESS" => Some(TicketStatus::InProgress),
            "CLOSED" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

/// Ticket priority, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "ticket_priority", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Ticket entity.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub organization_id: Uuid,
    /// Creator and owner.
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to create a ticket. The organization always comes from the
/// creating principal.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub organization_id: Uuid,
    pub user_id: Uuid,
}

impl Ticket {
    pub fn new(new: &NewTicket) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            description: new.description.clone(),
            status: TicketStatus::Open,
            priority: new.priority,
            organization_id: new.organization_id,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch in place and bump `updated_at`.
    pub fn apply(&mut self, patch: &TicketPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update of a ticket row.
#[derive(Debug, Clone, Default)]
pub struct TicketPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
}

/// Join row: a user responsible for resolving a ticket.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TicketAssignee {
    pub ticket_id: Uuid,
    pub user_id: Uuid,
}

/// Ticket as returned to callers, with its assignees.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub assignee_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketView {
    pub fn new(ticket: Ticket, assignee_ids: Vec<Uuid>) -> Self {
        Self {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            status: ticket.status,
            priority: ticket.priority,
            organization_id: ticket.organization_id,
            user_id: ticket.user_id,
            assignee_ids,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}
