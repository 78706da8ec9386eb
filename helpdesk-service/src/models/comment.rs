//! Comment model - threaded discussion on a ticket, one level of replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Comment entity.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    /// Author.
    pub user_id: Uuid,
    pub content: String,
    /// Private comments are visible to their author only.
    pub is_private: bool,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub edited_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_private: bool,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CommentPatch {
    pub content: String,
    pub edited_by: Uuid,
    pub edited_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(new: &NewComment) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_id: new.ticket_id,
            user_id: new.user_id,
            content: new.content.clone(),
            is_private: new.is_private,
            parent_id: new.parent_id,
            created_at: Utc::now(),
            edited_at: None,
            edited_by: None,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn apply(&mut self, patch: &CommentPatch) {
        self.content = patch.content.clone();
        self.edited_at = Some(patch.edited_at);
        self.edited_by = Some(patch.edited_by);
    }
}

/// A top-level comment and its replies.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

impl CommentThread {
    /// Group an already visibility-filtered list into threads: newest thread
    /// first, replies oldest first. Replies whose parent is not in the list
    /// are dropped.
    pub fn build(comments: Vec<Comment>) -> Vec<CommentThread> {
        let (mut tops, replies): (Vec<Comment>, Vec<Comment>) =
            comments.into_iter().partition(Comment::is_top_level);

        tops.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut threads: Vec<CommentThread> = tops
            .into_iter()
            .map(|comment| CommentThread {
                comment,
                replies: Vec::new(),
            })
            .collect();

        for reply in replies {
            if let Some(thread) = threads
                .iter_mut()
                .find(|t| Some(t.comment.id) == reply.parent_id)
            {
                thread.replies.push(reply);
            }
        }

        for thread in &mut threads {
            thread.replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        }

        threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn comment(ticket_id: Uuid, parent_id: Option<Uuid>, minutes_ago: i64) -> Comment {
        let mut c = Comment::new(&NewComment {
            ticket_id,
            user_id: Uuid::new_v4(),
            content: "text".to_string(),
            is_private: false,
            parent_id,
        });
        c.created_at = Utc::now() - Duration::minutes(minutes_ago);
        c
    }

    #[test]
    fn test_threads_are_ordered() {
        let ticket_id = Uuid::new_v4();
        let older = comment(ticket_id, None, 30);
        let newer = comment(ticket_id, None, 10);
        let late_reply = comment(ticket_id, Some(older.id), 1);
        let early_reply = comment(ticket_id, Some(older.id), 20);

        let threads = CommentThread::build(vec![
            older.clone(),
            late_reply.clone(),
            newer.clone(),
            early_reply.clone(),
        ]);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, newer.id);
        assert_eq!(threads[1].comment.id, older.id);
        let reply_ids: Vec<Uuid> = threads[1].replies.iter().map(|r| r.id).collect();
        assert_eq!(reply_ids, vec![early_reply.id, late_reply.id]);
    }

    #[test]
    fn test_orphaned_replies_are_dropped() {
        let ticket_id = Uuid::new_v4();
        let orphan = comment(ticket_id, Some(Uuid::new_v4()), 5);
        assert!(CommentThread::build(vec![orphan]).is_empty());
    }
}
