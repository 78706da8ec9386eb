use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::middleware::AuthPrincipal;
use crate::models::UserSummary;
use crate::AppState;

/// List members of the caller's organization
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Organization members", body = Vec<UserSummary>),
        (status = 401, description = "Unauthorized", body = crate::dtos::ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let users = state.directory.list_users(&principal).await?;
    Ok(Json(users))
}
