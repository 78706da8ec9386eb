use std::sync::Arc;

use super::{authorize, required, HelpdeskError};
use crate::models::{
    normalize_email, NewOrganization, NewUser, Organization, Role, User, UserSummary,
};
use crate::policy::{Operation, Principal, Scope};
use crate::store::Store;
use crate::utils::{hash_password, Password};

#[derive(Debug, Clone)]
pub struct RegisterOrganizationInput {
    pub company_name: String,
    pub bio: Option<String>,
    pub name: Option<String>,
    pub email: String,
    pub password: Password,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub organization: Organization,
    pub user: User,
}

/// Organization directory and self-service sign-up.
#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn Store>,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn list_users(&self, principal: &Principal) -> Result<Vec<UserSummary>, HelpdeskError> {
        let mut tx = self.store.begin().await?;

        let Scope::Users(filter) = authorize(Some(principal), &Operation::ListOrgUsers)? else {
            return Err(HelpdeskError::Internal(anyhow::anyhow!(
                "list_org_users returned a non-user scope"
            )));
        };

        let users = tx.find_users(&filter).await?;
        tx.commit().await?;

        Ok(users.iter().map(UserSummary::from).collect())
    }

    /// Create an organization together with its first member, a MANAGER.
    #[tracing::instrument(skip_all)]
    pub async fn register_organization(
        &self,
        input: RegisterOrganizationInput,
    ) -> Result<Registration, HelpdeskError> {
        let company_name = required("company_name", &input.company_name)?;
        let email = normalize_email(&required("email", &input.email)?);
        if !input.password.is_acceptable() {
            return Err(HelpdeskError::Invalid(
                "password must be at least 8 characters".to_string(),
            ));
        }
        let password_hash = hash_password(&input.password)?;

        let mut tx = self.store.begin().await?;
        let email_taken = tx.find_user_by_email(&email).await?.is_some();
        authorize(None, &Operation::RegisterOrganization { email_taken })?;

        let organization = tx
            .create_organization(&NewOrganization {
                name: company_name,
                bio: input.bio.filter(|b| !b.trim().is_empty()),
            })
            .await?;
        let user = tx
            .create_user(&NewUser {
                name: input.name.filter(|n| !n.trim().is_empty()),
                email,
                password_hash: Some(password_hash.into_string()),
                role: Role::Manager,
                organization_id: organization.id,
            })
            .await
            .map_err(HelpdeskError::from_store_conflict)?;
        tx.commit().await?;

        tracing::info!(organization_id = %organization.id, user_id = %user.id, "Organization registered");
        Ok(Registration { organization, user })
    }
}
