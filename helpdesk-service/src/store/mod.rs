//! Persistence gateways.
//!
//! A [`Store`] hands out [`Transaction`]s; every read and write a request
//! makes goes through one transaction so the policy decision and the write
//! it guards see the same rows. Gateways apply the filters they are given
//! and nothing else.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Comment, CommentPatch, Invitation, NewComment, NewInvitation, NewOrganization, NewTicket,
    NewUser, Organization, Ticket, TicketPatch, User,
};
use crate::policy::{CommentFilter, InvitationFilter, TicketFilter, TicketQuery, UserFilter};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness or state precondition did not hold at write time.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Row not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable")]
    Unavailable,
}

#[async_trait]
pub trait OrganizationGateway: Send {
    async fn create_organization(
        &mut self,
        new: &NewOrganization,
    ) -> Result<Organization, StoreError>;
    async fn find_organization(&mut self, id: Uuid) -> Result<Option<Organization>, StoreError>;
}

#[async_trait]
pub trait UserDirectory: Send {
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Case-insensitive lookup across all organizations.
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_users(&mut self, filter: &UserFilter) -> Result<Vec<User>, StoreError>;
    /// Fails with [`StoreError::Conflict`] when the email is already registered.
    async fn create_user(&mut self, new: &NewUser) -> Result<User, StoreError>;
}

#[async_trait]
pub trait TicketGateway: Send {
    async fn find_tickets(
        &mut self,
        filter: &TicketFilter,
        query: &TicketQuery,
    ) -> Result<Vec<Ticket>, StoreError>;
    async fn count_tickets(
        &mut self,
        filter: &TicketFilter,
        query: &TicketQuery,
    ) -> Result<u64, StoreError>;
    /// Locks the row until the transaction ends.
    async fn find_ticket(&mut self, id: Uuid) -> Result<Option<Ticket>, StoreError>;
    async fn ticket_assignees(&mut self, ticket_id: Uuid) -> Result<Vec<Uuid>, StoreError>;
    async fn create_ticket(&mut self, new: &NewTicket) -> Result<Ticket, StoreError>;
    async fn update_ticket(&mut self, id: Uuid, patch: &TicketPatch)
        -> Result<Ticket, StoreError>;
    /// Replace the assignee set wholesale.
    async fn replace_assignees(
        &mut self,
        ticket_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), StoreError>;
    /// Removes the ticket with its assignees and comments.
    async fn delete_ticket(&mut self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CommentGateway: Send {
    async fn find_comments(&mut self, filter: &CommentFilter) -> Result<Vec<Comment>, StoreError>;
    async fn find_comment(&mut self, id: Uuid) -> Result<Option<Comment>, StoreError>;
    async fn create_comment(&mut self, new: &NewComment) -> Result<Comment, StoreError>;
    async fn update_comment(
        &mut self,
        id: Uuid,
        patch: &CommentPatch,
    ) -> Result<Comment, StoreError>;
    /// Removes the comment and its replies.
    async fn delete_comment(&mut self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait InvitationGateway: Send {
    /// Serialize invitation issuance for one (organization, email) pair until
    /// the transaction ends. Call before looking for a pending invitation.
    async fn lock_invitee(&mut self, organization_id: Uuid, email: &str)
        -> Result<(), StoreError>;
    /// Locks the row until the transaction ends.
    async fn find_invitation_by_token_hash(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<Invitation>, StoreError>;
    async fn find_invitations(
        &mut self,
        filter: &InvitationFilter,
    ) -> Result<Vec<Invitation>, StoreError>;
    async fn create_invitation(&mut self, new: &NewInvitation) -> Result<Invitation, StoreError>;
    /// Flip `accepted` to true. Fails with [`StoreError::Conflict`] if it
    /// already was, so two racing acceptances cannot both succeed.
    async fn mark_invitation_accepted(&mut self, id: Uuid) -> Result<Invitation, StoreError>;
}

/// One unit of work. Dropping it without [`Transaction::commit`] rolls back.
#[async_trait]
pub trait Transaction:
    OrganizationGateway + UserDirectory + TicketGateway + CommentGateway + InvitationGateway + Send
{
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;
    async fn health_check(&self) -> Result<(), StoreError>;
}
