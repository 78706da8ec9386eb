use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::tickets::{
    AssignTicketRequest, CreateTicketRequest, ListTicketsParams, TicketListResponse,
    UpdateStatusRequest, UpdateTicketRequest,
};
use crate::middleware::AuthPrincipal;
use crate::models::TicketView;
use crate::services::{CreateTicketInput, UpdateTicketInput};
use crate::utils::ValidatedJson;
use crate::AppState;

/// List tickets visible to the caller
///
/// Managers see every ticket in their organization; everyone else sees
/// tickets they opened or are assigned to.
#[utoipa::path(
    get,
    path = "/tickets",
    params(ListTicketsParams),
    responses(
        (status = 200, description = "One page of tickets", body = TicketListResponse),
        (status = 401, description = "Unauthorized", body = crate::dtos::ErrorResponse)
    ),
    tag = "Tickets",
    security(("bearer_auth" = []))
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<TicketListResponse>, AppError> {
    let page = state.tickets.list(&principal, params.into()).await?;
    Ok(Json(page.into()))
}

/// Open a ticket
#[utoipa::path(
    post,
    path = "/tickets",
    request_body = CreateTicketRequest,
    responses(
        (status = 201, description = "Ticket created", body = TicketView),
        (status = 400, description = "Unknown assignee", body = crate::dtos::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Tickets",
    security(("bearer_auth" = []))
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ValidatedJson(req): ValidatedJson<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketView>), AppError> {
    let ticket = state
        .tickets
        .create(
            &principal,
            CreateTicketInput {
                title: req.title,
                description: req.description,
                priority: req.priority,
                assignee_ids: req.assignee_ids,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    get,
    path = "/tickets/{id}",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Ticket", body = TicketView),
        (status = 404, description = "Ticket not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Tickets",
    security(("bearer_auth" = []))
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketView>, AppError> {
    let ticket = state.tickets.get(&principal, id).await?;
    Ok(Json(ticket))
}

/// Edit title, description or priority (owner only)
#[utoipa::path(
    patch,
    path = "/tickets/{id}",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    request_body = UpdateTicketRequest,
    responses(
        (status = 200, description = "Ticket updated", body = TicketView),
        (status = 403, description = "Not the ticket owner", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Ticket not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Tickets",
    security(("bearer_auth" = []))
)]
pub async fn update_ticket(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTicketRequest>,
) -> Result<Json<TicketView>, AppError> {
    let ticket = state
        .tickets
        .update_fields(
            &principal,
            id,
            UpdateTicketInput {
                title: req.title,
                description: req.description,
                priority: req.priority,
            },
        )
        .await?;

    Ok(Json(ticket))
}

/// Delete a ticket with its comments (owner only)
#[utoipa::path(
    delete,
    path = "/tickets/{id}",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 204, description = "Ticket deleted"),
        (status = 403, description = "Not the ticket owner", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Ticket not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Tickets",
    security(("bearer_auth" = []))
)]
pub async fn delete_ticket(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.tickets.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move a ticket between OPEN, IN_PROGRESS and CLOSED
#[utoipa::path(
    patch,
    path = "/tickets/{id}/status",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = TicketView),
        (status = 400, description = "Invalid status", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Not owner, assignee or manager", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Ticket not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Tickets",
    security(("bearer_auth" = []))
)]
pub async fn update_ticket_status(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateStatusRequest>,
) -> Result<Json<TicketView>, AppError> {
    let ticket = state
        .tickets
        .update_status(&principal, id, &req.status)
        .await?;
    Ok(Json(ticket))
}

/// Replace the assignee set (owner only)
#[utoipa::path(
    put,
    path = "/tickets/{id}/assignees",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    request_body = AssignTicketRequest,
    responses(
        (status = 200, description = "Assignees replaced", body = TicketView),
        (status = 400, description = "Unknown assignee", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Not the ticket owner", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Ticket not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Tickets",
    security(("bearer_auth" = []))
)]
pub async fn assign_ticket(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AssignTicketRequest>,
) -> Result<Json<TicketView>, AppError> {
    let ticket = state
        .tickets
        .assign(&principal, id, &req.assignee_ids)
        .await?;
    Ok(Json(ticket))
}
