use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, message = "Content is required"))]
    #[schema(example = "Reproduced on staging")]
    pub content: String,

    /// Private comments are visible to their author only.
    #[serde(default)]
    pub is_private: bool,

    /// Top-level comment on the same ticket this replies to.
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EditCommentRequest {
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}
