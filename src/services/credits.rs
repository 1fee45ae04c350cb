use super::auth::Identity;
use super::badges::BadgeEvaluator;
use super::users::Accounts;
use super::{RequestHandler, Service, ServiceError};

use crate::models::rides::RideVisibility;
use crate::models::users::{CreditBalance, CreditKind, CreditTransaction};
use crate::repositories::users::UserRepository;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

/// Credits spent by the picker on a claim.
pub const CLAIM_COST: i64 = 1;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Credit paid to the creator for publishing a ride.
pub fn publish_credit(visibility: RideVisibility) -> i64 {
    if visibility.is_shared() {
        1
    } else {
        0
    }
}

/// Credit paid to the creator when the picker completes the ride.
pub fn completion_bonus(visibility: RideVisibility) -> i64 {
    if visibility.is_shared() {
        1
    } else {
        0
    }
}

/// Balance reads and manual adjustments. Ride-driven movements are applied
/// by the ride repository together with the state change they pay for.
#[derive(Clone)]
pub struct Ledger {
    users: Arc<dyn UserRepository>,
}

impl Ledger {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Ledger { users }
    }

    pub async fn history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<CreditTransaction>, ServiceError> {
        self.users
            .credit_history(user_id, limit)
            .await
            .map_err(ServiceError::repository("UserRepository"))
    }

    /// Adds `delta` to the balance. A balance never goes below zero.
    pub async fn adjust(
        &self,
        user_id: &str,
        delta: i64,
        current: i64,
        kind: CreditKind,
    ) -> Result<i64, ServiceError> {
        if current + delta < 0 {
            return Err(ServiceError::InsufficientCredits);
        }

        self.users
            .adjust_credits(user_id, delta, kind, None)
            .await
            .map_err(ServiceError::repository("UserRepository"))
    }
}

pub enum CreditRequest {
    Balance {
        identity: Identity,
        response: oneshot::Sender<Result<CreditBalance, ServiceError>>,
    },
    History {
        identity: Identity,
        limit: Option<i64>,
        response: oneshot::Sender<Result<Vec<CreditTransaction>, ServiceError>>,
    },
    Adjust {
        identity: Identity,
        user_id: String,
        amount: i64,
        response: oneshot::Sender<Result<CreditBalance, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct CreditRequestHandler {
    ledger: Ledger,
    accounts: Accounts,
    evaluator: BadgeEvaluator,
}

impl CreditRequestHandler {
    pub fn new(ledger: Ledger, accounts: Accounts, evaluator: BadgeEvaluator) -> Self {
        CreditRequestHandler {
            ledger,
            accounts,
            evaluator,
        }
    }

    async fn balance(&self, identity: &Identity) -> Result<CreditBalance, ServiceError> {
        let user = self.accounts.ensure_user(identity).await?;
        Ok(CreditBalance {
            credits: user.credits,
        })
    }

    async fn history(
        &self,
        identity: &Identity,
        limit: Option<i64>,
    ) -> Result<Vec<CreditTransaction>, ServiceError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
            return Err(ServiceError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_HISTORY_LIMIT
            )));
        }

        let user = self.accounts.ensure_user(identity).await?;
        self.ledger.history(&user.id, limit).await
    }

    async fn adjust(
        &self,
        identity: &Identity,
        user_id: &str,
        amount: i64,
    ) -> Result<CreditBalance, ServiceError> {
        let admin = self.accounts.require_admin(identity).await?;
        if amount == 0 {
            return Err(ServiceError::InvalidInput(
                "amount must not be zero".to_string(),
            ));
        }

        let target = self.accounts.find_user(user_id).await?;
        let credits = self
            .ledger
            .adjust(&target.id, amount, target.credits, CreditKind::Manual)
            .await?;
        log::info!(
            "Credits of {} adjusted by {} ({}), new balance {}.",
            target.id,
            amount,
            admin.id,
            credits
        );
        if amount > 0 {
            self.evaluator.evaluate_quietly(&target.id).await;
        }

        Ok(CreditBalance { credits })
    }
}

#[async_trait]
impl RequestHandler<CreditRequest> for CreditRequestHandler {
    async fn handle_request(&self, request: CreditRequest) {
        match request {
            CreditRequest::Balance { identity, response } => {
                let _ = response.send(self.balance(&identity).await);
            }
            CreditRequest::History {
                identity,
                limit,
                response,
            } => {
                let _ = response.send(self.history(&identity, limit).await);
            }
            CreditRequest::Adjust {
                identity,
                user_id,
                amount,
                response,
            } => {
                let _ = response.send(self.adjust(&identity, &user_id, amount).await);
            }
        }
    }
}

pub struct CreditService;

impl CreditService {
    pub fn new() -> Self {
        CreditService {}
    }
}

#[async_trait]
impl Service<CreditRequest, CreditRequestHandler> for CreditService {}
