//! In-process store for tests and local runs.
//!
//! A transaction holds the store-wide lock for its whole lifetime and works
//! on a private copy of the state; commit writes the copy back, drop
//! discards it. Transactions are therefore fully serialized.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    CommentGateway, InvitationGateway, OrganizationGateway, Store, StoreError, TicketGateway,
    Transaction, UserDirectory,
};
use crate::models::{
    Comment, CommentPatch, Invitation, NewComment, NewInvitation, NewOrganization, NewTicket,
    NewUser, Organization, Ticket, TicketPatch, User,
};
use crate::policy::{CommentFilter, InvitationFilter, TicketFilter, TicketQuery, UserFilter};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    organizations: HashMap<Uuid, Organization>,
    users: HashMap<Uuid, User>,
    tickets: HashMap<Uuid, Ticket>,
    assignees: HashMap<Uuid, Vec<Uuid>>,
    comments: HashMap<Uuid, Comment>,
    invitations: HashMap<Uuid, Invitation>,
}

impl MemoryState {
    fn assignees_of(&self, ticket_id: Uuid) -> &[Uuid] {
        self.assignees
            .get(&ticket_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn filtered_tickets(&self, filter: &TicketFilter, query: &TicketQuery) -> Vec<&Ticket> {
        self.tickets
            .values()
            .filter(|t| filter.matches(t, self.assignees_of(t.id)) && query.matches(t))
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl OrganizationGateway for MemoryTransaction {
    async fn create_organization(
        &mut self,
        new: &NewOrganization,
    ) -> Result<Organization, StoreError> {
        let org = Organization::new(new);
        self.working.organizations.insert(org.id, org.clone());
        Ok(org)
    }

    async fn find_organization(&mut self, id: Uuid) -> Result<Option<Organization>, StoreError> {
        Ok(self.working.organizations.get(&id).cloned())
    }
}

#[async_trait]
impl UserDirectory for MemoryTransaction {
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.email_matches(email))
            .cloned())
    }

    async fn find_users(&mut self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .working
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn create_user(&mut self, new: &NewUser) -> Result<User, StoreError> {
        if self.working.users.values().any(|u| u.email_matches(&new.email)) {
            return Err(StoreError::Conflict("email_already_exists".to_string()));
        }
        let user = User::new(new);
        self.working.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl TicketGateway for MemoryTransaction {
    async fn find_tickets(
        &mut self,
        filter: &TicketFilter,
        query: &TicketQuery,
    ) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets = self.working.filtered_tickets(filter, query);
        tickets.sort_by(|a, b| query.sort.compare(a, b));
        Ok(tickets
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .cloned()
            .collect())
    }

    async fn count_tickets(
        &mut self,
        filter: &TicketFilter,
        query: &TicketQuery,
    ) -> Result<u64, StoreError> {
        Ok(self.working.filtered_tickets(filter, query).len() as u64)
    }

    async fn find_ticket(&mut self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        Ok(self.working.tickets.get(&id).cloned())
    }

    async fn ticket_assignees(&mut self, ticket_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let mut ids = self.working.assignees_of(ticket_id).to_vec();
        ids.sort();
        Ok(ids)
    }

    async fn create_ticket(&mut self, new: &NewTicket) -> Result<Ticket, StoreError> {
        let ticket = Ticket::new(new);
        self.working.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn update_ticket(
        &mut self,
        id: Uuid,
        patch: &TicketPatch,
    ) -> Result<Ticket, StoreError> {
        let ticket = self
            .working
            .tickets
            .get_mut(&id)
            .ok_or(StoreError::NotFound)?;
        ticket.apply(patch);
        Ok(ticket.clone())
    }

    async fn replace_assignees(
        &mut self,
        ticket_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        let ticket = self
            .working
            .tickets
            .get_mut(&ticket_id)
            .ok_or(StoreError::NotFound)?;
        ticket.apply(&TicketPatch::default());

        let mut ids = user_ids.to_vec();
        ids.sort();
        ids.dedup();
        self.working.assignees.insert(ticket_id, ids);
        Ok(())
    }

    async fn delete_ticket(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.working
            .tickets
            .remove(&id)
            .ok_or(StoreError::NotFound)?;
        self.working.assignees.remove(&id);
        self.working.comments.retain(|_, c| c.ticket_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentGateway for MemoryTransaction {
    async fn find_comments(&mut self, filter: &CommentFilter) -> Result<Vec<Comment>, StoreError> {
        let mut comments: Vec<Comment> = self
            .working
            .comments
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn find_comment(&mut self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(self.working.comments.get(&id).cloned())
    }

    async fn create_comment(&mut self, new: &NewComment) -> Result<Comment, StoreError> {
        let comment = Comment::new(new);
        self.working.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(
        &mut self,
        id: Uuid,
        patch: &CommentPatch,
    ) -> Result<Comment, StoreError> {
        let comment = self
            .working
            .comments
            .get_mut(&id)
            .ok_or(StoreError::NotFound)?;
        comment.apply(patch);
        Ok(comment.clone())
    }

    async fn delete_comment(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.working
            .comments
            .remove(&id)
            .ok_or(StoreError::NotFound)?;
        self.working
            .comments
            .retain(|_, c| c.parent_id != Some(id));
        Ok(())
    }
}

#[async_trait]
impl InvitationGateway for MemoryTransaction {
    // The whole store is already held by this transaction.
    async fn lock_invitee(
        &mut self,
        _organization_id: Uuid,
        _email: &str,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_invitation_by_token_hash(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<Invitation>, StoreError> {
        Ok(self
            .working
            .invitations
            .values()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn find_invitations(
        &mut self,
        filter: &InvitationFilter,
    ) -> Result<Vec<Invitation>, StoreError> {
        let mut invitations: Vec<Invitation> = self
            .working
            .invitations
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    async fn create_invitation(&mut self, new: &NewInvitation) -> Result<Invitation, StoreError> {
        if self
            .working
            .invitations
            .values()
            .any(|i| i.token_hash == new.token_hash)
        {
            return Err(StoreError::Conflict("token_collision".to_string()));
        }
        let invitation = Invitation::new(new);
        self.working
            .invitations
            .insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn mark_invitation_accepted(&mut self, id: Uuid) -> Result<Invitation, StoreError> {
        let invitation = self
            .working
            .invitations
            .get_mut(&id)
            .ok_or(StoreError::NotFound)?;
        if invitation.accepted {
            return Err(StoreError::Conflict("already_accepted".to_string()));
        }
        invitation.accepted = true;
        Ok(invitation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, TicketPriority};

    async fn seed_org(store: &MemoryStore) -> (Organization, User) {
        let mut tx = store.begin().await.unwrap();
        let org = tx
            .create_organization(&NewOrganization {
                name: "Acme".to_string(),
                bio: None,
            })
            .await
            .unwrap();
        let user = tx
            .create_user(&NewUser {
                name: Some("Alice".to_string()),
                email: "alice@acme.com".to_string(),
                password_hash: None,
                role: Role::Manager,
                organization_id: org.id,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (org, user)
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        let (org, _) = seed_org(&store).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.create_user(&NewUser {
                name: None,
                email: "ghost@acme.com".to_string(),
                password_hash: None,
                role: Role::User,
                organization_id: org.id,
            })
            .await
            .unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_user_by_email("ghost@acme.com").await.unwrap().is_none());
        assert!(tx.find_user_by_email("ALICE@acme.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let (org, _) = seed_org(&store).await;

        let mut tx = store.begin().await.unwrap();
        let err = tx
            .create_user(&NewUser {
                name: None,
                email: "Alice@Acme.com".to_string(),
                password_hash: None,
                role: Role::User,
                organization_id: org.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_deleting_ticket_cascades() {
        let store = MemoryStore::new();
        let (org, alice) = seed_org(&store).await;

        let mut tx = store.begin().await.unwrap();
        let ticket = tx
            .create_ticket(&NewTicket {
                title: "VPN down".to_string(),
                description: "since 9am".to_string(),
                priority: TicketPriority::Urgent,
                organization_id: org.id,
                user_id: alice.id,
            })
            .await
            .unwrap();
        tx.replace_assignees(ticket.id, &[alice.id]).await.unwrap();
        let top = tx
            .create_comment(&NewComment {
                ticket_id: ticket.id,
                user_id: alice.id,
                content: "looking".to_string(),
                is_private: false,
                parent_id: None,
            })
            .await
            .unwrap();
        tx.delete_ticket(ticket.id).await.unwrap();

        assert!(tx.find_comment(top.id).await.unwrap().is_none());
        assert!(tx.ticket_assignees(ticket.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_acceptance_conflicts() {
        let store = MemoryStore::new();
        let (org, alice) = seed_org(&store).await;

        let mut tx = store.begin().await.unwrap();
        let inv = tx
            .create_invitation(&NewInvitation {
                email: "newhire@acme.com".to_string(),
                token_hash: "abc".to_string(),
                role: Role::User,
                organization_id: org.id,
                invited_by: alice.id,
                expires_at: chrono::Utc::now() + chrono::Duration::days(7),
            })
            .await
            .unwrap();

        assert!(tx.mark_invitation_accepted(inv.id).await.unwrap().accepted);
        assert!(matches!(
            tx.mark_invitation_accepted(inv.id).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
