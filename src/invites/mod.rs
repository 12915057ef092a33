/// Invitation management
///
/// Admins invite teachers by email. An invitation carries a random token
/// that the registration page submits back. Expiry is evaluated lazily
/// whenever an invitation is acted on.

mod manager;

pub use manager::InvitationManager;

use crate::store::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Length of generated invitation tokens
pub const TOKEN_LENGTH: usize = 32;

/// Invitation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Revoked => "revoked",
        }
    }

    /// Allowed status changes. Only a pending invitation can move.
    pub fn can_transition_to(&self, next: InvitationStatus) -> bool {
        matches!(
            (self, next),
            (
                InvitationStatus::Pending,
                InvitationStatus::Accepted | InvitationStatus::Expired | InvitationStatus::Revoked
            )
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

/// Invitation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: String,
    pub email: String,
    pub token: String,
    pub status: InvitationStatus,
    pub invited_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Record for Invitation {
    const DOCUMENT: &'static str = "invitations";
    const KIND: &'static str = "Invitation";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Invitation {
    /// Pending but past its expiry time
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Pending && now >= self.expires_at
    }

    /// Status as it would be after a lazy expiry check
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        if self.is_overdue(now) {
            InvitationStatus::Expired
        } else {
            self.status
        }
    }
}

/// Create invitation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

/// Status change for an invitation addressed by id or token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateInvitationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub status: InvitationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_transition_table() {
        use InvitationStatus::*;

        for next in [Accepted, Expired, Revoked] {
            assert!(Pending.can_transition_to(next));
        }
        assert!(!Pending.can_transition_to(Pending));

        for terminal in [Accepted, Expired, Revoked] {
            assert!(terminal.is_terminal());
            for next in [Pending, Accepted, Expired, Revoked] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_effective_status() {
        let now = Utc::now();
        let mut invitation = Invitation {
            id: "i1".to_string(),
            email: "new@school.edu".to_string(),
            token: "t".repeat(TOKEN_LENGTH),
            status: InvitationStatus::Pending,
            invited_by: "admin".to_string(),
            message: None,
            created_at: now - Duration::days(8),
            expires_at: now - Duration::days(1),
            accepted_at: None,
        };
        assert_eq!(invitation.effective_status(now), InvitationStatus::Expired);

        invitation.status = InvitationStatus::Revoked;
        assert_eq!(invitation.effective_status(now), InvitationStatus::Revoked);

        invitation.status = InvitationStatus::Pending;
        invitation.expires_at = now + Duration::days(1);
        assert_eq!(invitation.effective_status(now), InvitationStatus::Pending);
    }
}
