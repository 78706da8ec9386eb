use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::auth::SessionResponse;
use crate::dtos::invitations::{
    AcceptInvitationRequest, CreateInvitationRequest, CreateInvitationResponse,
    InvitationDetailsResponse, ValidateInvitationParams,
};
use crate::middleware::AuthPrincipal;
use crate::services::{AcceptInvitationInput, CreateInvitationInput};
use crate::utils::{Password, ValidatedJson};
use crate::AppState;

/// Invite someone into an organization (managers only)
#[utoipa::path(
    post,
    path = "/invitations",
    request_body = CreateInvitationRequest,
    responses(
        (status = 201, description = "Invitation issued", body = CreateInvitationResponse),
        (status = 403, description = "Not a manager of the organization", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Email registered or invitation pending", body = crate::dtos::ErrorResponse)
    ),
    tag = "Invitations",
    security(("bearer_auth" = []))
)]
pub async fn create_invitation(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    ValidatedJson(req): ValidatedJson<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<CreateInvitationResponse>), AppError> {
    let issued = state
        .invitations
        .create(
            &principal,
            CreateInvitationInput {
                email: req.email,
                role: req.role,
                organization_id: req.organization_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// Inspect an invitation token without consuming it
#[utoipa::path(
    get,
    path = "/invitations/validate",
    params(ValidateInvitationParams),
    responses(
        (status = 200, description = "Invitation is usable", body = InvitationDetailsResponse),
        (status = 400, description = "Accepted or expired", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Unknown token", body = crate::dtos::ErrorResponse)
    ),
    tag = "Invitations"
)]
pub async fn validate_invitation(
    State(state): State<AppState>,
    Query(params): Query<ValidateInvitationParams>,
) -> Result<Json<InvitationDetailsResponse>, AppError> {
    params.validate()?;
    let details = state.invitations.validate(&params.token).await?;
    Ok(Json(details.into()))
}

/// Accept an invitation and create the account in one step
#[utoipa::path(
    post,
    path = "/invitations/accept",
    request_body = AcceptInvitationRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Accepted, expired or email mismatch", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Unknown token", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::dtos::ErrorResponse)
    ),
    tag = "Invitations"
)]
pub async fn accept_invitation(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<AcceptInvitationRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let user = state
        .invitations
        .accept(AcceptInvitationInput {
            token: req.token,
            email: req.email,
            name: req.name,
            password: Password::new(req.password),
        })
        .await?;

    let access_token = state.jwt.generate_access_token(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.jwt.access_token_expiry_seconds(),
            user: user.summary(),
            organization: None,
        }),
    ))
}
