//! Invitation model - onboarding a new member into an organization.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Role;

/// Invitation state. Only `accepted` is stored; expiry is derived from time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationState {
    Pending,
    Accepted,
    Expired,
}

/// Invitation entity. The plaintext token is never stored.
#[derive(Debug, Clone, FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub token_hash: String,
    pub role: Role,
    pub organization_id: Uuid,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: String,
    pub token_hash: String,
    pub role: Role,
    pub organization_id: Uuid,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl NewInvitation {
    /// Expiry for an invitation created at `now`.
    pub fn expiry_from(now: DateTime<Utc>, valid_days: i64) -> DateTime<Utc> {
        now + Duration::days(valid_days)
    }
}

impl Invitation {
    pub fn new(new: &NewInvitation) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: new.email.clone(),
            token_hash: new.token_hash.clone(),
            role: new.role,
            organization_id: new.organization_id,
            invited_by: new.invited_by,
            expires_at: new.expires_at,
            accepted: false,
            created_at: Utc::now(),
        }
    }

    /// State at `now`. Acceptance wins over expiry.
    pub fn state(&self, now: DateTime<Utc>) -> InvitationState {
        if self.accepted {
            InvitationState::Accepted
        } else if now > self.expires_at {
            InvitationState::Expired
        } else {
            InvitationState::Pending
        }
    }

    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == InvitationState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(expires_in: Duration) -> Invitation {
        Invitation::new(&NewInvitation {
            email: "newhire@acme.com".to_string(),
            token_hash: "hash".to_string(),
            role: Role::User,
            organization_id: Uuid::new_v4(),
            invited_by: Uuid::new_v4(),
            expires_at: Utc::now() + expires_in,
        })
    }

    #[test]
    fn test_fresh_invitation_is_pending() {
        assert_eq!(invitation(Duration::days(7)).state(Utc::now()), InvitationState::Pending);
    }

    #[test]
    fn test_past_expiry_is_expired() {
        assert_eq!(
            invitation(Duration::seconds(-1)).state(Utc::now()),
            InvitationState::Expired
        );
    }

    #[test]
    fn test_accepted_wins_over_expired() {
        let mut inv = invitation(Duration::seconds(-1));
        inv.accepted = true;
        assert_eq!(inv.state(Utc::now()), InvitationState::Accepted);
    }

    #[test]
    fn test_expiry_is_seven_days_by_default() {
        let now = Utc::now();
        assert_eq!(NewInvitation::expiry_from(now, 7) - now, Duration::days(7));
    }
}
