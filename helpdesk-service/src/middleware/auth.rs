use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::policy::Principal;
use crate::AppState;

/// Resolve the bearer token to a [`Principal`] and stash it in the request
/// extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("unauthenticated")))?;

    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::Unauthorized(anyhow::anyhow!("unauthenticated"))
    })?;

    let principal = claims
        .principal()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("unauthenticated")))?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// The authenticated principal, as resolved by [`auth_middleware`].
pub struct AuthPrincipal(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("unauthenticated")))?;

        Ok(AuthPrincipal(principal))
    }
}
