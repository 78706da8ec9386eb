use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::comments::{CreateCommentRequest, EditCommentRequest};
use crate::middleware::AuthPrincipal;
use crate::models::{Comment, CommentThread};
use crate::services::NewCommentInput;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Comment threads on a ticket, private comments of others excluded
#[utoipa::path(
    get,
    path = "/tickets/{id}/comments",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Comment threads", body = Vec<CommentThread>),
        (status = 404, description = "Ticket not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Comments",
    security(("bearer_auth" = []))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Vec<CommentThread>>, AppError> {
    let threads = state.comments.list(&principal, ticket_id).await?;
    Ok(Json(threads))
}

#[utoipa::path(
    post,
    path = "/tickets/{id}/comments",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 400, description = "Invalid parent", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Ticket not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Comments",
    security(("bearer_auth" = []))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(ticket_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = state
        .comments
        .create(
            &principal,
            ticket_id,
            NewCommentInput {
                content: req.content,
                is_private: req.is_private,
                parent_id: req.parent_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Edit a comment (author only)
#[utoipa::path(
    patch,
    path = "/tickets/{id}/comments/{comment_id}",
    params(
        ("id" = Uuid, Path, description = "Ticket ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    request_body = EditCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 403, description = "Not the author", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Comment not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Comments",
    security(("bearer_auth" = []))
)]
pub async fn edit_comment(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((ticket_id, comment_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<EditCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let comment = state
        .comments
        .edit(&principal, ticket_id, comment_id, &req.content)
        .await?;
    Ok(Json(comment))
}

/// Delete a comment and its replies (author only)
#[utoipa::path(
    delete,
    path = "/tickets/{id}/comments/{comment_id}",
    params(
        ("id" = Uuid, Path, description = "Ticket ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the author", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Comment not found", body = crate::dtos::ErrorResponse)
    ),
    tag = "Comments",
    security(("bearer_auth" = []))
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path((ticket_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state
        .comments
        .delete(&principal, ticket_id, comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
