//! User model - organization-scoped accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role held by a user inside their organization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    User,
    Developer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::User => "USER",
            Role::Developer => "DEVELOPER",
        }
    }

    /// Roles allowed through manager gates (invitations, status bypass,
    /// organization-wide ticket listing).
    pub fn is_manager(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "USER" => Ok(Role::User),
            "DEVELOPER" => Ok(Role::Developer),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Canonical form of an email address. Stored emails are written in this
/// form and lookups compare against it.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    /// Absent until the account is activated.
    pub password_hash: Option<String>,
    pub role: Role,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub organization_id: Uuid,
}

impl User {
    pub fn new(new: &NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            role: new.role,
            organization_id: new.organization_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive email comparison used for uniqueness and invitation matching.
    pub fn email_matches(&self, email: &str) -> bool {
        normalize_email(&self.email) == normalize_email(email)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary::from(self)
    }
}

/// Directory entry returned to callers (no credentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!("DEVELOPER".parse::<Role>().unwrap(), Role::Developer);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_manager_gate() {
        assert!(Role::Admin.is_manager());
        assert!(Role::Manager.is_manager());
        assert!(!Role::User.is_manager());
        assert!(!Role::Developer.is_manager());
    }

    #[test]
    fn test_email_matches_ignores_case() {
        let user = User::new(&NewUser {
            name: None,
            email: "NewHire@Acme.com".to_string(),
            password_hash: None,
            role: Role::User,
            organization_id: Uuid::new_v4(),
        });
        assert!(user.email_matches("newhire@acme.com"));
        assert!(!user.email_matches("other@acme.com"));
    }

    #[test]
    fn test_email_matching_folds_non_ascii_case() {
        assert_eq!(normalize_email("  ÉLODIE@Acme.com "), "élodie@acme.com");
        let user = User::new(&NewUser {
            name: None,
            email: "ÉLODIE@acme.com".to_string(),
            password_hash: None,
            role: Role::User,
            organization_id: Uuid::new_v4(),
        });
        assert!(user.email_matches("élodie@acme.com"));
    }
}
