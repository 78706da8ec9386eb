use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::auth::{LoginRequest, RegisterOrganizationRequest, SessionResponse};
use crate::services::RegisterOrganizationInput;
use crate::utils::{Password, ValidatedJson};
use crate::AppState;

const TOKEN_TYPE: &str = "Bearer";

/// Register an organization and its first MANAGER
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterOrganizationRequest,
    responses(
        (status = 201, description = "Organization created", body = SessionResponse),
        (status = 409, description = "Email already registered", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterOrganizationRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let registration = state
        .directory
        .register_organization(RegisterOrganizationInput {
            company_name: req.company_name,
            bio: req.bio,
            name: req.name,
            email: req.email,
            password: Password::new(req.password),
        })
        .await?;

    let access_token = state.jwt.generate_access_token(&registration.user)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: state.jwt.access_token_expiry_seconds(),
            user: registration.user.summary(),
            organization: Some(registration.organization.summary()),
        }),
    ))
}

/// Exchange email and password for an access token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::dtos::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let result = state
        .auth
        .login(&req.email, &Password::new(req.password))
        .await?;

    Ok(Json(SessionResponse {
        access_token: result.access_token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: result.expires_in,
        user: result.user,
        organization: None,
    }))
}
