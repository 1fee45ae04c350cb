use super::activity::log_activity;
use super::auth::Identity;
use super::users::Accounts;
use super::RequestHandler;
use super::Service;
use super::ServiceError;

use crate::models::activity::ActionType;
use crate::models::badges::{
    self, find_badge, Badge, BadgeAward, EarnedBadge, UserStats, BADGE_CATALOG,
};
use crate::repositories::activity::ActivityRepository;
use crate::repositories::badges::BadgeRepository;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

type Threshold = fn(&UserStats) -> bool;

/// Badges derived from aggregate stats. `early-adopter` is granted once at
/// account creation and is not part of this table.
static THRESHOLDS: [(&str, Threshold); 6] = [
    (badges::FIRST_RIDE, |s| s.published >= 1),
    (badges::FIVE_RIDES, |s| s.published >= 5),
    (badges::SERIAL_PUBLISHER, |s| s.published >= 25),
    (badges::HUNDRED_RIDES, |s| s.published >= 100),
    (badges::HUNDRED_COMPLETED, |s| s.completed_as_picker >= 100),
    (badges::THOUSAND_CREDITS, |s| s.credits >= 1000),
];

pub fn qualifying_badges(stats: &UserStats) -> Vec<&'static str> {
    THRESHOLDS
        .iter()
        .filter(|(_, reached)| reached(stats))
        .map(|(id, _)| *id)
        .collect()
}

#[derive(Clone)]
pub struct BadgeEvaluator {
    badges: Arc<dyn BadgeRepository>,
    activity: Arc<dyn ActivityRepository>,
}

impl BadgeEvaluator {
    pub fn new(badges: Arc<dyn BadgeRepository>, activity: Arc<dyn ActivityRepository>) -> Self {
        BadgeEvaluator { badges, activity }
    }

    /// Awards every badge whose threshold the user now meets and does not
    /// hold yet. Returns only the newly awarded ones.
    pub async fn evaluate(&self, user_id: &str) -> Result<Vec<Badge>, anyhow::Error> {
        let stats = self.badges.user_stats(user_id).await?;
        let owned = self.badges.user_badges(user_id).await?;

        let mut awarded = Vec::new();
        for badge_id in qualifying_badges(&stats) {
            if owned.iter().any(|b| b.badge_id == badge_id) {
                continue;
            }
            if let Some(badge) = self.grant(user_id, badge_id).await? {
                awarded.push(badge);
            }
        }

        Ok(awarded)
    }

    /// Same as `evaluate`, but a failure only costs the caller the badges.
    pub async fn evaluate_quietly(&self, user_id: &str) -> Vec<Badge> {
        match self.evaluate(user_id).await {
            Ok(awarded) => awarded,
            Err(e) => {
                log::warn!("Badge evaluation failed for {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    /// Stores the award. `None` when the user already held the badge.
    pub async fn grant(
        &self,
        user_id: &str,
        badge_id: &str,
    ) -> Result<Option<Badge>, anyhow::Error> {
        let Some(badge) = find_badge(badge_id) else {
            anyhow::bail!("Unknown badge: {}", badge_id);
        };

        if !self.badges.award_badge(user_id, badge_id).await? {
            return Ok(None);
        }

        log::info!("User {} earned badge {}.", user_id, badge_id);
        log_activity(
            self.activity.as_ref(),
            user_id,
            ActionType::BadgeEarned,
            &format!("Badge earned: {}", badge.name),
            None,
        )
        .await;

        Ok(Some(badge.clone()))
    }

    pub async fn earned(&self, user_id: &str) -> Result<Vec<EarnedBadge>, anyhow::Error> {
        let earned = self
            .badges
            .user_badges(user_id)
            .await?
            .into_iter()
            .filter_map(|award| {
                find_badge(&award.badge_id).map(|badge| EarnedBadge {
                    badge: badge.clone(),
                    earned_at: award.earned_at,
                })
            })
            .collect();

        Ok(earned)
    }
}

pub enum BadgeRequest {
    Catalog {
        response: oneshot::Sender<Result<Vec<Badge>, ServiceError>>,
    },
    UserBadges {
        user_id: String,
        response: oneshot::Sender<Result<Vec<EarnedBadge>, ServiceError>>,
    },
    Award {
        identity: Identity,
        user_id: String,
        badge_id: String,
        response: oneshot::Sender<Result<BadgeAward, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct BadgeRequestHandler {
    evaluator: BadgeEvaluator,
    accounts: Accounts,
}

impl BadgeRequestHandler {
    pub fn new(evaluator: BadgeEvaluator, accounts: Accounts) -> Self {
        BadgeRequestHandler {
            evaluator,
            accounts,
        }
    }

    async fn user_badges(&self, user_id: &str) -> Result<Vec<EarnedBadge>, ServiceError> {
        self.evaluator
            .earned(user_id)
            .await
            .map_err(ServiceError::repository("BadgeRepository"))
    }

    async fn award(
        &self,
        identity: &Identity,
        user_id: &str,
        badge_id: &str,
    ) -> Result<BadgeAward, ServiceError> {
        self.accounts.require_admin(identity).await?;

        let badge = find_badge(badge_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Badge {}", badge_id)))?;
        self.accounts.find_user(user_id).await?;

        let awarded = self
            .evaluator
            .grant(user_id, badge_id)
            .await
            .map_err(ServiceError::repository("BadgeRepository"))?;

        Ok(BadgeAward {
            awarded: awarded.is_some(),
            badge: badge.clone(),
        })
    }
}

#[async_trait]
impl RequestHandler<BadgeRequest> for BadgeRequestHandler {
    async fn handle_request(&self, request: BadgeRequest) {
        match request {
            BadgeRequest::Catalog { response } => {
                let _ = response.send(Ok(BADGE_CATALOG.to_vec()));
            }
            BadgeRequest::UserBadges { user_id, response } => {
                let _ = response.send(self.user_badges(&user_id).await);
            }
            BadgeRequest::Award {
                identity,
                user_id,
                badge_id,
                response,
            } => {
                let result = self.award(&identity, &user_id, &badge_id).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct BadgeService;

impl BadgeService {
    pub fn new() -> Self {
        BadgeService {}
    }
}

#[async_trait]
impl Service<BadgeRequest, BadgeRequestHandler> for BadgeService {}
