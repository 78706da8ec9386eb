use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{OrganizationSummary, UserSummary};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterOrganizationRequest {
    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    #[schema(example = "Acme")]
    pub company_name: String,

    #[schema(example = "We make anvils")]
    pub bio: Option<String>,

    #[schema(example = "Alice")]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@acme.com")]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "password123", min_length = 8)]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@acme.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

/// Session token plus the account it belongs to.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    #[schema(example = 3600)]
    pub expires_in: i64,
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationSummary>,
}
