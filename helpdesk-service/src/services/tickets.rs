use std::sync::Arc;
use uuid::Uuid;

use super::{authorize, load_ticket, required, resolve_principal, HelpdeskError};
use crate::models::{NewTicket, TicketPatch, TicketPriority, TicketStatus, TicketView, User};
use crate::policy::{
    AssigneeCheck, DenyReason, Operation, Principal, Scope, TicketQuery, TicketSnapshot,
    UserFilter,
};
use crate::store::{Store, Transaction};

#[derive(Debug, Clone)]
pub struct CreateTicketInput {
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub assignee_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTicketInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TicketPriority>,
}

#[derive(Debug, Clone)]
pub struct TicketPage {
    pub items: Vec<TicketView>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn Store>,
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();
    ids
}

impl TicketService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, principal, query), fields(user_id = %principal.user_id))]
    pub async fn list(
        &self,
        principal: &Principal,
        query: TicketQuery,
    ) -> Result<TicketPage, HelpdeskError> {
        let query = query.normalized();
        let mut tx = self.store.begin().await?;

        let Scope::Tickets(filter) = authorize(Some(principal), &Operation::ListTickets)? else {
            return Err(HelpdeskError::Internal(anyhow::anyhow!(
                "list_tickets returned a non-ticket scope"
            )));
        };

        let total = tx.count_tickets(&filter, &query).await?;
        let tickets = tx.find_tickets(&filter, &query).await?;

        let mut items = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let assignees = tx.ticket_assignees(ticket.id).await?;
            items.push(TicketView::new(ticket, assignees));
        }
        tx.commit().await?;

        let page_size = u64::from(query.page_size);
        let total_pages = u32::try_from(total.div_ceil(page_size)).unwrap_or(u32::MAX);

        Ok(TicketPage {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
            total_pages,
        })
    }

    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn get(
        &self,
        principal: &Principal,
        ticket_id: Uuid,
    ) -> Result<TicketView, HelpdeskError> {
        let mut tx = self.store.begin().await?;
        let (ticket, assignees) = load_ticket(tx.as_mut(), ticket_id).await?;

        authorize(
            Some(principal),
            &Operation::ViewTicket {
                ticket: TicketSnapshot::new(&ticket, &assignees),
            },
        )?;
        tx.commit().await?;

        Ok(TicketView::new(ticket, assignees))
    }

    #[tracing::instrument(skip(self, principal, input), fields(user_id = %principal.user_id))]
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreateTicketInput,
    ) -> Result<TicketView, HelpdeskError> {
        let title = required("title", &input.title)?;
        let description = required("description", &input.description)?;
        let requested = dedup(&input.assignee_ids);

        let mut tx = self.store.begin().await?;
        let resolved = resolve_assignees(tx.as_mut(), principal.organization_id, &requested).await?;

        let Scope::Tenant(organization_id) = authorize(
            Some(principal),
            &Operation::CreateTicket {
                assignees: AssigneeCheck::new(&requested, &resolved),
            },
        )?
        else {
            return Err(HelpdeskError::Internal(anyhow::anyhow!(
                "create_ticket returned a non-tenant scope"
            )));
        };

        let ticket = tx
            .create_ticket(&NewTicket {
                title,
                description,
                priority: input.priority,
                organization_id,
                user_id: principal.user_id,
            })
            .await?;
        if !requested.is_empty() {
            tx.replace_assignees(ticket.id, &requested).await?;
        }
        let assignees = tx.ticket_assignees(ticket.id).await?;
        tx.commit().await?;

        tracing::info!(ticket_id = %ticket.id, "Ticket created");
        Ok(TicketView::new(ticket, assignees))
    }

    #[tracing::instrument(skip(self, principal, input), fields(user_id = %principal.user_id))]
    pub async fn update_fields(
        &self,
        principal: &Principal,
        ticket_id: Uuid,
        input: UpdateTicketInput,
    ) -> Result<TicketView, HelpdeskError> {
        let patch = TicketPatch {
            title: input.title.as_deref().map(|t| required("title", t)).transpose()?,
            description: input
                .description
                .as_deref()
                .map(|d| required("description", d))
                .transpose()?,
            priority: input.priority,
            status: None,
        };

        let mut tx = self.store.begin().await?;
        let (ticket, assignees) = load_ticket(tx.as_mut(), ticket_id).await?;

        authorize(
            Some(principal),
            &Operation::UpdateTicketFields {
                ticket: TicketSnapshot::new(&ticket, &assignees),
            },
        )?;

        let updated = tx.update_ticket(ticket_id, &patch).await?;
        tx.commit().await?;

        Ok(TicketView::new(updated, assignees))
    }

    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn update_status(
        &self,
        principal: &Principal,
        ticket_id: Uuid,
        status: &str,
    ) -> Result<TicketView, HelpdeskError> {
        let mut tx = self.store.begin().await?;
        let (ticket, assignees) = load_ticket(tx.as_mut(), ticket_id).await?;

        let operation = Operation::UpdateTicketStatus {
            ticket: TicketSnapshot::new(&ticket, &assignees),
            status,
        };
        let current = resolve_principal(tx.as_mut(), principal, operation.freshness()).await?;
        authorize(Some(&current), &operation)?;

        let status = TicketStatus::parse(status)
            .ok_or(HelpdeskError::Denied(DenyReason::InvalidStatus))?;
        let updated = tx
            .update_ticket(
                ticket_id,
                &TicketPatch {
                    status: Some(status),
                    ..TicketPatch::default()
                },
            )
            .await?;
        tx.commit().await?;

        tracing::info!(ticket_id = %ticket_id, status = status.as_str(), "Ticket status changed");
        Ok(TicketView::new(updated, assignees))
    }

    #[tracing::instrument(skip(self, principal, assignee_ids), fields(user_id = %principal.user_id))]
    pub async fn assign(
        &self,
        principal: &Principal,
        ticket_id: Uuid,
        assignee_ids: &[Uuid],
    ) -> Result<TicketView, HelpdeskError> {
        let requested = dedup(assignee_ids);

        let mut tx = self.store.begin().await?;
        let (ticket, current) = load_ticket(tx.as_mut(), ticket_id).await?;
        let resolved =
            resolve_assignees(tx.as_mut(), ticket.organization_id, &requested).await?;

        authorize(
            Some(principal),
            &Operation::AssignTicket {
                ticket: TicketSnapshot::new(&ticket, &current),
                assignees: AssigneeCheck::new(&requested, &resolved),
            },
        )?;

        tx.replace_assignees(ticket_id, &requested).await?;
        let updated = tx
            .find_ticket(ticket_id)
            .await?
            .ok_or(HelpdeskError::NotFound)?;
        let assignees = tx.ticket_assignees(ticket_id).await?;
        tx.commit().await?;

        Ok(TicketView::new(updated, assignees))
    }

    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn delete(&self, principal: &Principal, ticket_id: Uuid) -> Result<(), HelpdeskError> {
        let mut tx = self.store.begin().await?;
        let (ticket, assignees) = load_ticket(tx.as_mut(), ticket_id).await?;

        authorize(
            Some(principal),
            &Operation::DeleteTicket {
                ticket: TicketSnapshot::new(&ticket, &assignees),
            },
        )?;

        tx.delete_ticket(ticket_id).await?;
        tx.commit().await?;

        tracing::info!(ticket_id = %ticket_id, "Ticket deleted");
        Ok(())
    }
}

async fn resolve_assignees(
    tx: &mut dyn Transaction,
    organization_id: Uuid,
    requested: &[Uuid],
) -> Result<Vec<User>, HelpdeskError> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }
    Ok(tx
        .find_users(&UserFilter::organization(organization_id).with_ids(requested))
        .await?)
}
