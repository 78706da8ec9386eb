use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{authorize, load_ticket, required, HelpdeskError};
use crate::models::{Comment, CommentPatch, CommentThread, NewComment};
use crate::policy::{Operation, ParentRef, Principal, Scope, TicketSnapshot};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct NewCommentInput {
    pub content: String,
    pub is_private: bool,
    pub parent_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn Store>,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Threads visible to `principal` on one ticket.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn list(
        &self,
        principal: &Principal,
        ticket_id: Uuid,
    ) -> Result<Vec<CommentThread>, HelpdeskError> {
        let mut tx = self.store.begin().await?;
        let (ticket, assignees) = load_ticket(tx.as_mut(), ticket_id).await?;

        let scope = authorize(
            Some(principal),
            &Operation::ListComments {
                ticket: TicketSnapshot::new(&ticket, &assignees),
            },
        )?;
        let Scope::Comments(filter) = scope else {
            return Err(HelpdeskError::Internal(anyhow::anyhow!(
                "list_comments returned a non-comment scope"
            )));
        };

        let comments = tx.find_comments(&filter).await?;
        tx.commit().await?;

        Ok(CommentThread::build(comments))
    }

    #[tracing::instrument(skip(self, principal, input), fields(user_id = %principal.user_id))]
    pub async fn create(
        &self,
        principal: &Principal,
        ticket_id: Uuid,
        input: NewCommentInput,
    ) -> Result<Comment, HelpdeskError> {
        let content = required("content", &input.content)?;

        let mut tx = self.store.begin().await?;
        let (ticket, assignees) = load_ticket(tx.as_mut(), ticket_id).await?;
        let parent = match input.parent_id {
            Some(id) => Some((id, tx.find_comment(id).await?)),
            None => None,
        };

        authorize(
            Some(principal),
            &Operation::CreateComment {
                ticket: TicketSnapshot::new(&ticket, &assignees),
                parent: parent
                    .as_ref()
                    .map(|(id, found)| ParentRef {
                        id: *id,
                        found: found.as_ref(),
                    }),
            },
        )?;

        let comment = tx
            .create_comment(&NewComment {
                ticket_id,
                user_id: principal.user_id,
                content,
                is_private: input.is_private,
                parent_id: input.parent_id,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(comment_id = %comment.id, ticket_id = %ticket_id, "Comment created");
        Ok(comment)
    }

    #[tracing::instrument(skip(self, principal, content), fields(user_id = %principal.user_id))]
    pub async fn edit(
        &self,
        principal: &Principal,
        ticket_id: Uuid,
        comment_id: Uuid,
        content: &str,
    ) -> Result<Comment, HelpdeskError> {
        let content = required("content", content)?;

        let mut tx = self.store.begin().await?;
        let (ticket, assignees) = load_ticket(tx.as_mut(), ticket_id).await?;
        let comment = tx
            .find_comment(comment_id)
            .await?
            .ok_or(HelpdeskError::NotFound)?;

        authorize(
            Some(principal),
            &Operation::EditComment {
                ticket: TicketSnapshot::new(&ticket, &assignees),
                comment: &comment,
            },
        )?;

        let updated = tx
            .update_comment(
                comment_id,
                &CommentPatch {
                    content,
                    edited_by: principal.user_id,
                    edited_at: Utc::now(),
                },
            )
            .await?;
        tx.commit().await?;

        Ok(updated)
    }

    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn delete(
        &self,
        principal: &Principal,
        ticket_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), HelpdeskError> {
        let mut tx = self.store.begin().await?;
        let (ticket, assignees) = load_ticket(tx.as_mut(), ticket_id).await?;
        let comment = tx
            .find_comment(comment_id)
            .await?
            .ok_or(HelpdeskError::NotFound)?;

        authorize(
            Some(principal),
            &Operation::DeleteComment {
                ticket: TicketSnapshot::new(&ticket, &assignees),
                comment: &comment,
            },
        )?;

        tx.delete_comment(comment_id).await?;
        tx.commit().await?;

        Ok(())
    }
}
