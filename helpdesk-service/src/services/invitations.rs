//! Invitation workflow: issue, inspect, and accept-with-registration as a
//! single transaction.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::notifier::{InvitationCreated, InvitationNotifier};
use super::{authorize, required, resolve_principal, HelpdeskError};
use crate::models::{
    normalize_email, NewInvitation, NewUser, OrganizationSummary, Role, User, UserSummary,
};
use crate::policy::{InvitationFilter, Operation, OperationKind, Principal, Scope};
use crate::store::Store;
use crate::utils::{generate_invitation_token, hash_password, hash_token, Password};

#[derive(Debug, Clone)]
pub struct CreateInvitationInput {
    pub email: String,
    pub role: Option<Role>,
    /// Defaults to the inviter's organization.
    pub organization_id: Option<Uuid>,
}

/// Returned to the inviter once. The plaintext token is not recoverable later.
#[derive(Debug, Clone)]
pub struct IssuedInvitation {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub organization: OrganizationSummary,
    pub token: String,
    pub accept_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InvitationDetails {
    pub email: String,
    pub role: Role,
    pub organization: OrganizationSummary,
    pub inviter: Option<UserSummary>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AcceptInvitationInput {
    pub token: String,
    pub email: String,
    pub name: Option<String>,
    pub password: Password,
}

#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn InvitationNotifier>,
    public_base_url: String,
    expiry_days: i64,
}

impl InvitationService {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn InvitationNotifier>,
        public_base_url: impl Into<String>,
        expiry_days: i64,
    ) -> Self {
        Self {
            store,
            notifier,
            public_base_url: public_base_url.into(),
            expiry_days,
        }
    }

    fn accept_url(&self, token: &str) -> String {
        format!(
            "{}/auth/register?token={}",
            self.public_base_url.trim_end_matches('/'),
            token
        )
    }

    #[tracing::instrument(skip(self, principal, input), fields(user_id = %principal.user_id))]
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreateInvitationInput,
    ) -> Result<IssuedInvitation, HelpdeskError> {
        let email = normalize_email(&required("email", &input.email)?);
        let organization_id = input.organization_id.unwrap_or(principal.organization_id);
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        let current = resolve_principal(
            tx.as_mut(),
            principal,
            OperationKind::CreateInvitation.freshness(),
        )
        .await?;

        tx.lock_invitee(organization_id, &email).await?;
        let email_taken = tx.find_user_by_email(&email).await?.is_some();
        let pending_exists = !tx
            .find_invitations(&InvitationFilter::pending_for(organization_id, &email, now))
            .await?
            .is_empty();

        let Scope::Tenant(organization_id) = authorize(
            Some(&current),
            &Operation::CreateInvitation {
                organization_id,
                email_taken,
                pending_exists,
            },
        )?
        else {
            return Err(HelpdeskError::Internal(anyhow::anyhow!(
                "create_invitation returned a non-tenant scope"
            )));
        };

        let organization = tx
            .find_organization(organization_id)
            .await?
            .ok_or(HelpdeskError::NotFound)?;

        let token = generate_invitation_token();
        let invitation = tx
            .create_invitation(&NewInvitation {
                email,
                token_hash: hash_token(&token),
                role: input.role.unwrap_or(Role::User),
                organization_id,
                invited_by: current.user_id,
                expires_at: NewInvitation::expiry_from(now, self.expiry_days),
            })
            .await?;
        tx.commit().await?;

        let accept_url = self.accept_url(&token);
        tracing::info!(invitation_id = %invitation.id, organization_id = %organization_id, "Invitation created");

        self.notifier
            .invitation_created(&InvitationCreated {
                invitation_id: invitation.id,
                email: invitation.email.clone(),
                token: token.clone(),
                organization_id,
                invited_by: invitation.invited_by,
                expires_at: invitation.expires_at,
                accept_url: accept_url.clone(),
            })
            .await;

        Ok(IssuedInvitation {
            id: invitation.id,
            email: invitation.email,
            role: invitation.role,
            organization: organization.summary(),
            token,
            accept_url,
            expires_at: invitation.expires_at,
        })
    }

    /// Look a token up without consuming it.
    #[tracing::instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<InvitationDetails, HelpdeskError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let invitation = tx.find_invitation_by_token_hash(&hash_token(token)).await?;

        authorize(
            None,
            &Operation::ValidateInvitation {
                invitation: invitation.as_ref(),
                now,
            },
        )?;
        let invitation = invitation.ok_or(HelpdeskError::NotFound)?;

        let organization = tx
            .find_organization(invitation.organization_id)
            .await?
            .ok_or(HelpdeskError::NotFound)?;
        let inviter = tx
            .find_user(invitation.invited_by)
            .await?
            .map(|u| u.summary());
        tx.commit().await?;

        Ok(InvitationDetails {
            email: invitation.email,
            role: invitation.role,
            organization: organization.summary(),
            inviter,
            expires_at: invitation.expires_at,
        })
    }

    /// Consume the token and create the invited account. Either both happen
    /// or neither does.
    #[tracing::instrument(skip_all)]
    pub async fn accept(&self, input: AcceptInvitationInput) -> Result<User, HelpdeskError> {
        if !input.password.is_acceptable() {
            return Err(HelpdeskError::Invalid(
                "password must be at least 8 characters".to_string(),
            ));
        }
        let password_hash = hash_password(&input.password)?;
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        let invitation = tx
            .find_invitation_by_token_hash(&hash_token(&input.token))
            .await?;
        let email_taken = match &invitation {
            Some(inv) => tx.find_user_by_email(&inv.email).await?.is_some(),
            None => false,
        };

        let Scope::Tenant(organization_id) = authorize(
            None,
            &Operation::AcceptInvitation {
                invitation: invitation.as_ref(),
                email: &input.email,
                email_taken,
                now,
            },
        )?
        else {
            return Err(HelpdeskError::Internal(anyhow::anyhow!(
                "accept_invitation returned a non-tenant scope"
            )));
        };
        let invitation = invitation.ok_or(HelpdeskError::NotFound)?;

        let accepted = tx
            .mark_invitation_accepted(invitation.id)
            .await
            .map_err(HelpdeskError::from_store_conflict)?;
        let user = tx
            .create_user(&NewUser {
                name,
                email: accepted.email.clone(),
                password_hash: Some(password_hash.into_string()),
                role: accepted.role,
                organization_id,
            })
            .await
            .map_err(HelpdeskError::from_store_conflict)?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, invitation_id = %accepted.id, "Invitation accepted");
        Ok(user)
    }
}
