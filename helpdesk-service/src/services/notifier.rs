//! Out-of-band delivery of invitation links.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

/// Emitted once an invitation has been committed. Carries the only copy of
/// the plaintext token.
#[derive(Debug, Clone)]
pub struct InvitationCreated {
    pub invitation_id: Uuid,
    pub email: String,
    pub token: String,
    pub organization_id: Uuid,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub accept_url: String,
}

#[async_trait]
pub trait InvitationNotifier: Send + Sync {
    /// Delivery is best effort; failures are logged, never surfaced.
    async fn invitation_created(&self, event: &InvitationCreated);
}

/// Writes invitation events to the log. The token itself is not logged.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl InvitationNotifier for TracingNotifier {
    async fn invitation_created(&self, event: &InvitationCreated) {
        tracing::info!(
            invitation_id = %event.invitation_id,
            organization_id = %event.organization_id,
            invited_by = %event.invited_by,
            email = %event.email,
            expires_at = %event.expires_at,
            "Invitation ready for delivery"
        );
    }
}

/// Keeps every event in memory so tests can pick up the token.
#[derive(Debug, Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<InvitationCreated>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<InvitationCreated> {
        self.sent.lock().ok().and_then(|sent| sent.last().cloned())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }
}

#[async_trait]
impl InvitationNotifier for MockNotifier {
    async fn invitation_created(&self, event: &InvitationCreated) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(event.clone());
        }
    }
}
