/// Invitation manager backed by the `invitations` JSON document
use crate::{
    account::{normalize_email, User},
    error::{ApiError, ApiResult},
    invites::{
        CreateInvitationRequest, Invitation, InvitationStatus, UpdateInvitationRequest,
        TOKEN_LENGTH,
    },
    metrics,
    store::{Collection, DocumentBackend},
};
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Invitation manager
pub struct InvitationManager {
    invitations: Collection<Invitation>,
    expiry: Duration,
}

fn expired_error() -> ApiError {
    ApiError::Validation("Invitation has expired".to_string())
}

/// Which invitation a request addresses
enum Lookup<'a> {
    Id(&'a str),
    Token(&'a str),
}

impl Lookup<'_> {
    fn matches(&self, invitation: &Invitation) -> bool {
        match self {
            Lookup::Id(id) => invitation.id == *id,
            Lookup::Token(token) => invitation.token == *token,
        }
    }
}

impl InvitationManager {
    pub fn new(backend: Arc<dyn DocumentBackend>, expiry_days: i64) -> Self {
        Self {
            invitations: Collection::new(backend),
            expiry: Duration::days(expiry_days),
        }
    }

    /// Generate a random invitation token
    pub fn generate_token() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    /// All invitations, newest first, as stored
    pub async fn list(&self) -> ApiResult<Vec<Invitation>> {
        let mut invitations = self.invitations.all().await?;
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    /// Invite an email address.
    ///
    /// Whether the address already belongs to an account is checked by the
    /// caller; a second live invitation for the same address is refused here.
    pub async fn create(&self, inviter: &User, req: CreateInvitationRequest) -> ApiResult<Invitation> {
        req.validate()?;

        let email = normalize_email(&req.email);
        let message = req
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let invitation = self
            .invitations
            .update(|invitations| {
                let now = Utc::now();
                if invitations
                    .iter()
                    .any(|i| i.email == email && i.effective_status(now) == InvitationStatus::Pending)
                {
                    return Err(ApiError::Conflict(
                        "A pending invitation already exists for this email".to_string(),
                    ));
                }

                let invitation = Invitation {
                    id: Uuid::new_v4().to_string(),
                    email: email.clone(),
                    token: Self::generate_token(),
                    status: InvitationStatus::Pending,
                    invited_by: inviter.id.clone(),
                    message,
                    created_at: now,
                    expires_at: now + self.expiry,
                    accepted_at: None,
                };
                invitations.push(invitation.clone());
                Ok(invitation)
            })
            .await?;

        metrics::record_invitation_transition(InvitationStatus::Pending.as_str());
        tracing::info!("{} invited {}", inviter.id, invitation.email);

        Ok(invitation)
    }

    /// Look up an invitation by token, reporting its effective status
    pub async fn find_by_token(&self, token: &str) -> ApiResult<Invitation> {
        let mut invitation = self
            .invitations
            .find(|i| i.token == token)
            .await?
            .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

        invitation.status = invitation.effective_status(Utc::now());
        Ok(invitation)
    }

    /// Run `f` on the addressed invitation after the lazy expiry check.
    ///
    /// An overdue pending invitation is flipped to `expired` and written back
    /// before the request fails, whatever `f` would have done.
    async fn act_on<R, F>(&self, lookup: Lookup<'_>, f: F) -> ApiResult<R>
    where
        F: FnOnce(&mut Invitation, DateTime<Utc>) -> ApiResult<R>,
    {
        let outcome = self
            .invitations
            .update(|invitations| {
                let now = Utc::now();
                let invitation = invitations
                    .iter_mut()
                    .find(|i| lookup.matches(i))
                    .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

                if invitation.is_overdue(now) {
                    invitation.status = InvitationStatus::Expired;
                    return Ok(Err(expired_error()));
                }

                // Only a successful action is persisted
                f(invitation, now).map(Ok)
            })
            .await;

        match outcome {
            Ok(Err(err)) => {
                metrics::record_invitation_transition(InvitationStatus::Expired.as_str());
                tracing::info!("Invitation expired on use");
                Err(err)
            }
            Ok(Ok(value)) => Ok(value),
            Err(err) => Err(err),
        }
    }

    /// Admin status change, addressed by id or token
    pub async fn update(&self, req: UpdateInvitationRequest) -> ApiResult<Invitation> {
        let lookup = match (req.id.as_deref(), req.token.as_deref()) {
            (Some(id), _) if !id.is_empty() => Lookup::Id(id),
            (_, Some(token)) if !token.is_empty() => Lookup::Token(token),
            _ => {
                return Err(ApiError::Validation(
                    "Invitation id or token is required".to_string(),
                ))
            }
        };
        let next = req.status;

        let invitation = self
            .act_on(lookup, |invitation, _now| {
                if next == InvitationStatus::Accepted {
                    return Err(ApiError::Validation(
                        "Invitations are accepted by registering".to_string(),
                    ));
                }
                if !invitation.status.can_transition_to(next) {
                    return Err(ApiError::Validation(format!(
                        "Cannot change a {} invitation to {}",
                        invitation.status.as_str(),
                        next.as_str()
                    )));
                }
                invitation.status = next;
                Ok(invitation.clone())
            })
            .await?;

        metrics::record_invitation_transition(next.as_str());
        tracing::info!("Invitation {} is now {}", invitation.id, next.as_str());
        Ok(invitation)
    }

    /// Check that `token` lets `email` register right now
    pub async fn validate_for_registration(&self, token: &str, email: &str) -> ApiResult<Invitation> {
        let email = normalize_email(email);

        self.act_on(Lookup::Token(token), |invitation, _now| {
            if invitation.status != InvitationStatus::Pending {
                return Err(ApiError::Validation(format!(
                    "Invitation is {}",
                    invitation.status.as_str()
                )));
            }
            if invitation.email != email {
                return Err(ApiError::Validation(
                    "Invitation was issued for a different email".to_string(),
                ));
            }
            Ok(invitation.clone())
        })
        .await
        .map_err(|err| match err {
            ApiError::NotFound(_) => ApiError::Validation("Invalid invitation token".to_string()),
            other => other,
        })
    }

    /// Record that the invited person registered
    pub async fn mark_accepted(&self, id: &str) -> ApiResult<Invitation> {
        let invitation = self
            .act_on(Lookup::Id(id), |invitation, now| {
                if !invitation.status.can_transition_to(InvitationStatus::Accepted) {
                    return Err(ApiError::Validation(format!(
                        "Invitation is {}",
                        invitation.status.as_str()
                    )));
                }
                invitation.status = InvitationStatus::Accepted;
                invitation.accepted_at = Some(now);
                Ok(invitation.clone())
            })
            .await?;

        metrics::record_invitation_transition(InvitationStatus::Accepted.as_str());
        Ok(invitation)
    }

    /// Number of invitations still waiting on a reply
    pub async fn pending_count(&self) -> ApiResult<usize> {
        let now = Utc::now();
        Ok(self
            .invitations
            .all()
            .await?
            .iter()
            .filter(|i| i.effective_status(now) == InvitationStatus::Pending)
            .count())
    }

    #[cfg(test)]
    async fn backdate(&self, id: &str) {
        self.invitations
            .modify(id, |invitation| {
                invitation.expires_at = Utc::now() - Duration::minutes(1);
                Ok(())
            })
            .await
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{account::Role, store::MemoryDocumentBackend};

    fn admin() -> User {
        let now = Utc::now();
        User {
            id: "admin-1".to_string(),
            email: "head@school.edu".to_string(),
            password_hash: String::new(),
            display_name: "Head of Design".to_string(),
            school: None,
            job_title: None,
            bio: None,
            avatar_url: None,
            role: Role::Admin,
            created_at: now,
            updated_at: now,
        }
    }

    fn invite(email: &str) -> CreateInvitationRequest {
        CreateInvitationRequest {
            email: email.to_string(),
            message: Some("Join us!".to_string()),
        }
    }

    fn manager() -> InvitationManager {
        InvitationManager::new(Arc::new(MemoryDocumentBackend::new()), 7)
    }

    fn set_status(id: &str, status: InvitationStatus) -> UpdateInvitationRequest {
        UpdateInvitationRequest {
            id: Some(id.to_string()),
            token: None,
            status,
        }
    }

    #[tokio::test]
    async fn test_create_invitation() {
        let invites = manager();
        let invitation = invites.create(&admin(), invite("New@School.edu")).await.unwrap();

        assert_eq!(invitation.email, "new@school.edu");
        assert_eq!(invitation.token.len(), TOKEN_LENGTH);
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert_eq!((invitation.expires_at - invitation.created_at).num_days(), 7);

        let err = invites.create(&admin(), invite("new@school.edu")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_revoke_is_terminal() {
        let invites = manager();
        let invitation = invites.create(&admin(), invite("a@school.edu")).await.unwrap();

        let revoked = invites
            .update(set_status(&invitation.id, InvitationStatus::Revoked))
            .await
            .unwrap();
        assert_eq!(revoked.status, InvitationStatus::Revoked);

        let err = invites
            .update(set_status(&invitation.id, InvitationStatus::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_accept_only_through_registration() {
        let invites = manager();
        let invitation = invites.create(&admin(), invite("a@school.edu")).await.unwrap();

        let err = invites
            .update(set_status(&invitation.id, InvitationStatus::Accepted))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let valid = invites
            .validate_for_registration(&invitation.token, "A@school.edu")
            .await
            .unwrap();
        let accepted = invites.mark_accepted(&valid.id).await.unwrap();
        assert_eq!(accepted.status, InvitationStatus::Accepted);
        assert!(accepted.accepted_at.is_some());

        // A used token cannot register a second account
        assert!(invites
            .validate_for_registration(&invitation.token, "a@school.edu")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_registration_checks_email_and_token() {
        let invites = manager();
        let invitation = invites.create(&admin(), invite("a@school.edu")).await.unwrap();

        let err = invites
            .validate_for_registration(&invitation.token, "b@school.edu")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = invites
            .validate_for_registration("not-a-real-token", "a@school.edu")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_put_after_expiry_flips_to_expired() {
        let invites = manager();
        let invitation = invites.create(&admin(), invite("late@school.edu")).await.unwrap();
        invites.backdate(&invitation.id).await;

        // Still shows pending in storage until acted on
        assert_eq!(invites.list().await.unwrap()[0].status, InvitationStatus::Pending);
        assert_eq!(
            invites.find_by_token(&invitation.token).await.unwrap().status,
            InvitationStatus::Expired
        );

        let err = invites
            .update(UpdateInvitationRequest {
                id: None,
                token: Some(invitation.token.clone()),
                status: InvitationStatus::Revoked,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m.contains("expired")));

        let stored = invites.list().await.unwrap();
        assert_eq!(stored[0].status, InvitationStatus::Expired);

        // A fresh invitation for the same address is allowed now
        invites.create(&admin(), invite("late@school.edu")).await.unwrap();
        assert_eq!(invites.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_invitation() {
        let invites = manager();
        let err = invites
            .update(set_status("missing", InvitationStatus::Revoked))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = invites
            .update(UpdateInvitationRequest {
                id: None,
                token: None,
                status: InvitationStatus::Revoked,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
