use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{OrganizationSummary, Role, UserSummary};
use crate::services::{InvitationDetails, IssuedInvitation};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvitationRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "newhire@acme.com")]
    pub email: String,

    /// Defaults to USER.
    pub role: Option<Role>,

    /// Defaults to the caller's organization.
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateInvitationResponse {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub organization: OrganizationSummary,
    /// Shown once; only a digest is stored.
    pub token: String,
    pub accept_url: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedInvitation> for CreateInvitationResponse {
    fn from(issued: IssuedInvitation) -> Self {
        Self {
            id: issued.id,
            email: issued.email,
            role: issued.role,
            organization: issued.organization,
            token: issued.token,
            accept_url: issued.accept_url,
            expires_at: issued.expires_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ValidateInvitationParams {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvitationDetailsResponse {
    pub email: String,
    pub role: Role,
    pub organization: OrganizationSummary,
    pub inviter: Option<UserSummary>,
    pub expires_at: DateTime<Utc>,
}

impl From<InvitationDetails> for InvitationDetailsResponse {
    fn from(details: InvitationDetails) -> Self {
        Self {
            email: details.email,
            role: details.role,
            organization: details.organization,
            inviter: details.inviter,
            expires_at: details.expires_at,
        }
    }
}

/// Token plus the registration form, submitted together.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AcceptInvitationRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "newhire@acme.com")]
    pub email: String,

    #[schema(example = "New Hire")]
    pub name: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(min_length = 8)]
    pub password: String,
}
