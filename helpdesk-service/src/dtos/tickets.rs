use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{TicketPriority, TicketStatus, TicketView};
use crate::policy::{TicketQuery, TicketSort};
use crate::services::TicketPage;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTicketRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    #[schema(example = "Login broken")]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    #[schema(example = "Submitting the login form returns a 500")]
    pub description: String,

    pub priority: TicketPriority,

    #[serde(default)]
    pub assignee_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTicketRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1))]
    pub description: Option<String>,

    pub priority: Option<TicketPriority>,
}

/// The status arrives as free text so unknown values surface as
/// `invalid_status` rather than a body parse error.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    #[schema(example = "IN_PROGRESS")]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignTicketRequest {
    pub assignee_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTicketsParams {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub sort: Option<TicketSort>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Between 1 and 100, default 10.
    pub page_size: Option<u32>,
}

impl From<ListTicketsParams> for TicketQuery {
    fn from(params: ListTicketsParams) -> Self {
        let defaults = TicketQuery::default();
        TicketQuery {
            status: params.status,
            priority: params.priority,
            sort: params.sort.unwrap_or(defaults.sort),
            page: params.page.unwrap_or(defaults.page),
            page_size: params.page_size.unwrap_or(defaults.page_size),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TicketListResponse {
    pub items: Vec<TicketView>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl From<TicketPage> for TicketListResponse {
    fn from(page: TicketPage) -> Self {
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        }
    }
}
