//! Organization model - the tenant boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Organization entity. Every user, ticket and invitation belongs to exactly one.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create an organization.
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub bio: Option<String>,
}

impl Organization {
    pub fn new(new: &NewOrganization) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            bio: new.bio.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> OrganizationSummary {
        OrganizationSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Organization reference embedded in other responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
}
