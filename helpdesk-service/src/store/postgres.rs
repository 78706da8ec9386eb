//! PostgreSQL gateways over a single sqlx transaction.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::QueryBuilder;
use uuid::Uuid;

use super::{
    CommentGateway, InvitationGateway, OrganizationGateway, Store, StoreError, TicketGateway,
    Transaction, UserDirectory,
};
use crate::models::{
    normalize_email, Comment, CommentPatch, Invitation, NewComment, NewInvitation,
    NewOrganization, NewTicket, NewUser, Organization, Ticket, TicketPatch, User,
};
use crate::policy::{CommentFilter, InvitationFilter, TicketFilter, TicketQuery, UserFilter};

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                StoreError::Unavailable
            })?;
        Ok(())
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// Map a unique-constraint violation to a conflict carrying `reason`.
fn conflict_on_unique(reason: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(reason.to_string())
        }
        _ => StoreError::Database(e),
    }
}

fn push_ticket_conditions(
    qb: &mut QueryBuilder<'_, Postgres>,
    filter: &TicketFilter,
    query: &TicketQuery,
) {
    qb.push(" WHERE t.organization_id = ")
        .push_bind(filter.organization_id);

    if let Some(user_id) = filter.participant {
        qb.push(" AND (t.user_id = ")
            .push_bind(user_id)
            .push(" OR EXISTS (SELECT 1 FROM ticket_assignees a WHERE a.ticket_id = t.id AND a.user_id = ")
            .push_bind(user_id)
            .push("))");
    }
    if let Some(status) = query.status {
        qb.push(" AND t.status = ").push_bind(status);
    }
    if let Some(priority) = query.priority {
        qb.push(" AND t.priority = ").push_bind(priority);
    }
}

#[async_trait]
impl OrganizationGateway for PgTransaction {
    async fn create_organization(
        &mut self,
        new: &NewOrganization,
    ) -> Result<Organization, StoreError> {
        let org = Organization::new(new);
        let row = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (id, name, bio, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(org.id)
        .bind(&org.name)
        .bind(&org.bio)
        .bind(org.created_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn find_organization(&mut self, id: Uuid) -> Result<Option<Organization>, StoreError> {
        let row = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl UserDirectory for PgTransaction {
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = $1")
            .bind(normalize_email(email))
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn find_users(&mut self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE organization_id = ");
        qb.push_bind(filter.organization_id);
        if let Some(ids) = &filter.ids {
            qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        }
        qb.push(" ORDER BY created_at ASC");

        let rows = qb
            .build_query_as::<User>()
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn create_user(&mut self, new: &NewUser) -> Result<User, StoreError> {
        let user = User::new(new);
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, organization_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.organization_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(conflict_on_unique("email_already_exists"))
    }
}

#[async_trait]
impl TicketGateway for PgTransaction {
    async fn find_tickets(
        &mut self,
        filter: &TicketFilter,
        query: &TicketQuery,
    ) -> Result<Vec<Ticket>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT t.* FROM tickets t");
        push_ticket_conditions(&mut qb, filter, query);
        qb.push(" ORDER BY ")
            .push(query.sort.order_by_sql())
            .push(" LIMIT ")
            .push_bind(query.limit() as i64)
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let rows = qb
            .build_query_as::<Ticket>()
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn count_tickets(
        &mut self,
        filter: &TicketFilter,
        query: &TicketQuery,
    ) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tickets t");
        push_ticket_conditions(&mut qb, filter, query);

        let (count,): (i64,) = qb.build_query_as().fetch_one(&mut *self.tx).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn find_ticket(&mut self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn ticket_assignees(&mut self, ticket_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM ticket_assignees WHERE ticket_id = $1 ORDER BY user_id",
        )
        .bind(ticket_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn create_ticket(&mut self, new: &NewTicket) -> Result<Ticket, StoreError> {
        let ticket = Ticket::new(new);
        let row = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (id, title, description, status, priority, organization_id, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(ticket.id)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.status)
        .bind(ticket.priority)
        .bind(ticket.organization_id)
        .bind(ticket.user_id)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn update_ticket(
        &mut self,
        id: Uuid,
        patch: &TicketPatch,
    ) -> Result<Ticket, StoreError> {
        sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.priority)
        .bind(patch.status)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn replace_assignees(
        &mut self,
        ticket_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM ticket_assignees WHERE ticket_id = $1")
            .bind(ticket_id)
            .execute(&mut *self.tx)
            .await?;

        if !user_ids.is_empty() {
            let mut qb =
                QueryBuilder::<Postgres>::new("INSERT INTO ticket_assignees (ticket_id, user_id) ");
            qb.push_values(user_ids, |mut row, user_id| {
                row.push_bind(ticket_id).push_bind(*user_id);
            });
            qb.push(" ON CONFLICT DO NOTHING");
            qb.build().execute(&mut *self.tx).await?;
        }

        sqlx::query("UPDATE tickets SET updated_at = NOW() WHERE id = $1")
            .bind(ticket_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_ticket(&mut self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentGateway for PgTransaction {
    async fn find_comments(&mut self, filter: &CommentFilter) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT * FROM comments
            WHERE ticket_id = $1 AND (is_private = FALSE OR user_id = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(filter.ticket_id)
        .bind(filter.viewer)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn find_comment(&mut self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        let row = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn create_comment(&mut self, new: &NewComment) -> Result<Comment, StoreError> {
        let comment = Comment::new(new);
        let row = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, ticket_id, user_id, content, is_private, parent_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(comment.id)
        .bind(comment.ticket_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .bind(comment.is_private)
        .bind(comment.parent_id)
        .bind(comment.created_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn update_comment(
        &mut self,
        id: Uuid,
        patch: &CommentPatch,
    ) -> Result<Comment, StoreError> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments SET content = $2, edited_at = $3, edited_by = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.content)
        .bind(patch.edited_at)
        .bind(patch.edited_by)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_comment(&mut self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl InvitationGateway for PgTransaction {
    async fn lock_invitee(
        &mut self,
        organization_id: Uuid,
        email: &str,
    ) -> Result<(), StoreError> {
        let key = format!("invitation:{}:{}", organization_id, normalize_email(email));
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(key)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_invitation_by_token_hash(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<Invitation>, StoreError> {
        let row = sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE token_hash = $1 FOR UPDATE",
        )
        .bind(token_hash)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn find_invitations(
        &mut self,
        filter: &InvitationFilter,
    ) -> Result<Vec<Invitation>, StoreError> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT * FROM invitations WHERE organization_id = ");
        qb.push_bind(filter.organization_id);
        if let Some(email) = &filter.email {
            qb.push(" AND LOWER(email) = ")
                .push_bind(normalize_email(email));
        }
        if let Some(now) = filter.pending_at {
            qb.push(" AND accepted = FALSE AND expires_at >= ").push_bind(now);
        }
        qb.push(" ORDER BY created_at DESC");

        let rows = qb
            .build_query_as::<Invitation>()
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn create_invitation(&mut self, new: &NewInvitation) -> Result<Invitation, StoreError> {
        let invitation = Invitation::new(new);
        sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO invitations (id, email, token_hash, role, organization_id, invited_by, expires_at, accepted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(invitation.id)
        .bind(&invitation.email)
        .bind(&invitation.token_hash)
        .bind(invitation.role)
        .bind(invitation.organization_id)
        .bind(invitation.invited_by)
        .bind(invitation.expires_at)
        .bind(invitation.accepted)
        .bind(invitation.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(conflict_on_unique("token_collision"))
    }

    async fn mark_invitation_accepted(&mut self, id: Uuid) -> Result<Invitation, StoreError> {
        sqlx::query_as::<_, Invitation>(
            "UPDATE invitations SET accepted = TRUE WHERE id = $1 AND accepted = FALSE RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::Conflict("already_accepted".to_string()))
    }
}
