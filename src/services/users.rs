use super::auth::Identity;
use super::badges::BadgeEvaluator;
use super::{RequestHandler, Service, ServiceError};

use crate::models::badges::EARLY_ADOPTER;
use crate::models::groups::normalize_email;
use crate::models::users::{
    User, VerificationRequest, VerificationReview, VerificationStatus,
};
use crate::repositories::groups::GroupRepository;
use crate::repositories::users::UserRepository;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

/// Lazily materialized user records and the checks built on them.
#[derive(Clone)]
pub struct Accounts {
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    evaluator: BadgeEvaluator,
    starting_balance: i64,
    early_adopter_cutoff: DateTime<Utc>,
}

impl Accounts {
    pub fn new(
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn GroupRepository>,
        evaluator: BadgeEvaluator,
        starting_balance: i64,
        early_adopter_cutoff: DateTime<Utc>,
    ) -> Self {
        Accounts {
            users,
            groups,
            evaluator,
            starting_balance,
            early_adopter_cutoff,
        }
    }

    /// Returns the caller's record, creating it with the starting balance on
    /// first contact.
    pub async fn ensure_user(&self, identity: &Identity) -> Result<User, ServiceError> {
        let email = identity
            .email
            .as_deref()
            .map(normalize_email)
            .unwrap_or_default();

        let (user, created) = self
            .users
            .ensure_user(&identity.user_id, &email, self.starting_balance)
            .await
            .map_err(ServiceError::repository("UserRepository"))?;

        if created {
            log::info!(
                "Created user {} with {} credits.",
                user.id,
                user.credits
            );
            self.welcome(&user).await;
        }

        Ok(user)
    }

    async fn welcome(&self, user: &User) {
        if user.created_at < self.early_adopter_cutoff {
            if let Err(e) = self.evaluator.grant(&user.id, EARLY_ADOPTER).await {
                log::warn!("Could not award early-adopter to {}: {}", user.id, e);
            }
        }

        if !user.email.is_empty() {
            self.link_invitations(&user.email, &user.id).await;
        }
    }

    /// Attaches email-only invitations to the user. Failures are logged.
    pub async fn link_invitations(&self, email: &str, user_id: &str) {
        match self.groups.link_invitations(email, user_id).await {
            Ok(0) => {}
            Ok(linked) => log::info!("Linked {} invitation(s) to {}.", linked, user_id),
            Err(e) => log::warn!("Could not link invitations for {}: {}", user_id, e),
        }
    }

    pub async fn require_admin(&self, identity: &Identity) -> Result<User, ServiceError> {
        let user = self.ensure_user(identity).await?;
        if !user.is_admin {
            return Err(ServiceError::Forbidden(
                "Administrator rights required".to_string(),
            ));
        }
        Ok(user)
    }

    pub async fn find_user(&self, user_id: &str) -> Result<User, ServiceError> {
        self.users
            .get_user(user_id)
            .await
            .map_err(ServiceError::repository("UserRepository"))?
            .ok_or_else(|| ServiceError::NotFound(format!("User {}", user_id)))
    }
}

pub enum UserRequest {
    Profile {
        identity: Identity,
        response: oneshot::Sender<Result<User, ServiceError>>,
    },
    SubmitVerification {
        identity: Identity,
        request: VerificationRequest,
        response: oneshot::Sender<Result<User, ServiceError>>,
    },
    PendingVerifications {
        identity: Identity,
        response: oneshot::Sender<Result<Vec<User>, ServiceError>>,
    },
    ReviewVerification {
        identity: Identity,
        user_id: String,
        review: VerificationReview,
        response: oneshot::Sender<Result<User, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    accounts: Accounts,
    repository: Arc<dyn UserRepository>,
}

fn require_field(name: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidInput(format!("{} is required", name)));
    }
    Ok(())
}

impl UserRequestHandler {
    pub fn new(accounts: Accounts, repository: Arc<dyn UserRepository>) -> Self {
        UserRequestHandler {
            accounts,
            repository,
        }
    }

    async fn submit_verification(
        &self,
        identity: &Identity,
        mut request: VerificationRequest,
    ) -> Result<User, ServiceError> {
        let user = self.accounts.ensure_user(identity).await?;
        if user.verification_status == VerificationStatus::Verified {
            return Err(ServiceError::InvalidState(
                "Account is already verified".to_string(),
            ));
        }

        require_field("full_name", &request.full_name)?;
        require_field("phone", &request.phone)?;
        require_field("siren", &request.siren)?;
        require_field("professional_card_number", &request.professional_card_number)?;
        request.email = request.email.as_deref().map(normalize_email);
        if let Some(email) = &request.email {
            if !email.contains('@') {
                return Err(ServiceError::InvalidInput(format!(
                    "Invalid email: {}",
                    email
                )));
            }
        }

        let user = self
            .repository
            .submit_verification(&user.id, &request)
            .await
            .map_err(ServiceError::repository("UserRepository"))?;

        if let Some(email) = &request.email {
            self.accounts.link_invitations(email, &user.id).await;
        }

        Ok(user)
    }

    async fn pending_verifications(&self, identity: &Identity) -> Result<Vec<User>, ServiceError> {
        self.accounts.require_admin(identity).await?;

        self.repository
            .pending_verifications()
            .await
            .map_err(ServiceError::repository("UserRepository"))
    }

    async fn review_verification(
        &self,
        identity: &Identity,
        user_id: &str,
        mut review: VerificationReview,
    ) -> Result<User, ServiceError> {
        self.accounts.require_admin(identity).await?;

        match review.status {
            VerificationStatus::Verified => review.rejection_reason = None,
            VerificationStatus::Rejected => {}
            _ => {
                return Err(ServiceError::InvalidInput(
                    "status must be VERIFIED or REJECTED".to_string(),
                ))
            }
        }

        let target = self.accounts.find_user(user_id).await?;
        if target.verification_status != VerificationStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "No pending verification for {}",
                user_id
            )));
        }

        let user = self
            .repository
            .review_verification(user_id, &review)
            .await
            .map_err(ServiceError::repository("UserRepository"))?;
        log::info!(
            "Verification of {} reviewed by {}: {:?}",
            user_id,
            identity.user_id,
            user.verification_status
        );

        Ok(user)
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::Profile { identity, response } => {
                let user = self.accounts.ensure_user(&identity).await;
                let _ = response.send(user);
            }
            UserRequest::SubmitVerification {
                identity,
                request,
                response,
            } => {
                let user = self.submit_verification(&identity, request).await;
                let _ = response.send(user);
            }
            UserRequest::PendingVerifications { identity, response } => {
                let users = self.pending_verifications(&identity).await;
                let _ = response.send(users);
            }
            UserRequest::ReviewVerification {
                identity,
                user_id,
                review,
                response,
            } => {
                let user = self.review_verification(&identity, &user_id, review).await;
                let _ = response.send(user);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}
