pub mod auth;
pub mod comments;
pub mod invitations;
pub mod tickets;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body. `error` is a stable reason code such as `not_owner`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "not_owner")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
