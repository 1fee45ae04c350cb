use super::activity::log_activity;
use super::auth::Identity;
use super::badges::BadgeEvaluator;
use super::credits::{completion_bonus, publish_credit, CLAIM_COST};
use super::users::Accounts;
use super::{RequestHandler, Service, ServiceError};

use crate::models::activity::ActionType;
use crate::models::groups::MemberStatus;
use crate::models::rides::{
    ClaimOutcome, ClaimedRide, CompletedRide, MyRidesKind, NewRide, PublishedRide, Ride,
    RideFilter, RideStatus, RideVisibility,
};
use crate::repositories::activity::ActivityRepository;
use crate::repositories::groups::GroupRepository;
use crate::repositories::rides::RideRepository;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::oneshot;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

pub enum RideRequest {
    Publish {
        identity: Identity,
        ride: NewRide,
        response: oneshot::Sender<Result<PublishedRide, ServiceError>>,
    },
    List {
        identity: Identity,
        filter: RideFilter,
        response: oneshot::Sender<Result<Vec<Ride>, ServiceError>>,
    },
    Get {
        identity: Identity,
        ride_id: String,
        response: oneshot::Sender<Result<Ride, ServiceError>>,
    },
    Claim {
        identity: Identity,
        ride_id: String,
        response: oneshot::Sender<Result<ClaimedRide, ServiceError>>,
    },
    Complete {
        identity: Identity,
        ride_id: String,
        response: oneshot::Sender<Result<CompletedRide, ServiceError>>,
    },
    Delete {
        identity: Identity,
        ride_id: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    MyRides {
        identity: Identity,
        kind: MyRidesKind,
        response: oneshot::Sender<Result<Vec<Ride>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct RideRequestHandler {
    rides: Arc<dyn RideRepository>,
    groups: Arc<dyn GroupRepository>,
    activity: Arc<dyn ActivityRepository>,
    accounts: Accounts,
    evaluator: BadgeEvaluator,
}

fn validate_new_ride(ride: &NewRide) -> Result<(), ServiceError> {
    if ride.pickup_address.trim().is_empty() || ride.dropoff_address.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "pickup_address and dropoff_address are required".to_string(),
        ));
    }
    if ride.price_cents < 0 {
        return Err(ServiceError::InvalidInput(
            "price_cents must not be negative".to_string(),
        ));
    }
    if ride.distance_km.is_some_and(|km| km < 0.0) {
        return Err(ServiceError::InvalidInput(
            "distance_km must not be negative".to_string(),
        ));
    }
    if ride.duration_minutes.is_some_and(|minutes| minutes < 0) {
        return Err(ServiceError::InvalidInput(
            "duration_minutes must not be negative".to_string(),
        ));
    }
    match (ride.visibility, &ride.group_id) {
        (RideVisibility::Group, None) => Err(ServiceError::InvalidInput(
            "group_id is required for GROUP rides".to_string(),
        )),
        (RideVisibility::Public | RideVisibility::Personal, Some(_)) => Err(
            ServiceError::InvalidInput("group_id is only allowed for GROUP rides".to_string()),
        ),
        _ => Ok(()),
    }
}

fn validate_filter(filter: &RideFilter) -> Result<i64, ServiceError> {
    if filter.skip < 0 {
        return Err(ServiceError::InvalidInput(
            "skip must not be negative".to_string(),
        ));
    }
    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(ServiceError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(limit)
}

impl RideRequestHandler {
    pub fn new(
        rides: Arc<dyn RideRepository>,
        groups: Arc<dyn GroupRepository>,
        activity: Arc<dyn ActivityRepository>,
        accounts: Accounts,
        evaluator: BadgeEvaluator,
    ) -> Self {
        RideRequestHandler {
            rides,
            groups,
            activity,
            accounts,
            evaluator,
        }
    }

    async fn find_ride(&self, ride_id: &str) -> Result<Ride, ServiceError> {
        self.rides
            .get_ride(ride_id)
            .await
            .map_err(ServiceError::repository("RideRepository"))?
            .ok_or_else(|| ServiceError::NotFound(format!("Ride {}", ride_id)))
    }

    async fn require_active_member(&self, group_id: &str, user_id: &str) -> Result<(), ServiceError> {
        self.groups
            .get_group(group_id)
            .await
            .map_err(ServiceError::repository("GroupRepository"))?
            .ok_or_else(|| ServiceError::NotFound(format!("Group {}", group_id)))?;

        let membership = self
            .groups
            .membership(group_id, user_id)
            .await
            .map_err(ServiceError::repository("GroupRepository"))?;
        match membership {
            Some(member) if member.status == MemberStatus::Active => Ok(()),
            _ => Err(ServiceError::Forbidden(format!(
                "Not an active member of group {}",
                group_id
            ))),
        }
    }

    async fn publish(
        &self,
        identity: &Identity,
        ride: NewRide,
    ) -> Result<PublishedRide, ServiceError> {
        validate_new_ride(&ride)?;
        let user = self.accounts.ensure_user(identity).await?;
        if let Some(group_id) = &ride.group_id {
            self.require_active_member(group_id, &user.id).await?;
        }

        let credits_awarded = publish_credit(ride.visibility);
        let ride = self
            .rides
            .insert_ride(&user.id, &ride, credits_awarded)
            .await
            .map_err(ServiceError::repository("RideRepository"))?;
        log::info!(
            "Ride {} published by {} ({:?}).",
            ride.id,
            user.id,
            ride.visibility
        );

        log_activity(
            self.activity.as_ref(),
            &user.id,
            ActionType::RidePublished,
            &format!("Published {} → {}", ride.pickup_address, ride.dropoff_address),
            Some(&ride.id),
        )
        .await;
        let new_badges = self.evaluator.evaluate_quietly(&user.id).await;

        Ok(PublishedRide {
            ride,
            credits_awarded,
            new_badges,
        })
    }

    async fn list(&self, identity: &Identity, filter: RideFilter) -> Result<Vec<Ride>, ServiceError> {
        let limit = validate_filter(&filter)?;

        match self.rides.expire_past_rides(Utc::now()).await {
            Ok(0) => {}
            Ok(expired) => log::info!("Expired {} past ride(s).", expired),
            Err(e) => log::warn!("Could not expire past rides: {}", e),
        }

        self.rides
            .list_rides(&identity.user_id, &filter, limit)
            .await
            .map_err(ServiceError::repository("RideRepository"))
    }

    async fn get(&self, identity: &Identity, ride_id: &str) -> Result<Ride, ServiceError> {
        let ride = self.find_ride(ride_id).await?;
        if ride.visibility == RideVisibility::Personal && ride.creator_id != identity.user_id {
            return Err(ServiceError::NotFound(format!("Ride {}", ride_id)));
        }
        Ok(ride)
    }

    /// Explains why the conditional claim matched nothing.
    fn claim_refusal(ride: &Ride, picker_id: &str) -> ServiceError {
        if !ride.status.can_transition_to(RideStatus::Claimed) {
            ServiceError::InvalidState(format!(
                "Ride is {}, only PUBLISHED rides can be claimed",
                ride.status.as_str()
            ))
        } else if ride.creator_id == picker_id {
            ServiceError::InvalidInput("Cannot claim your own ride".to_string())
        } else {
            ServiceError::InvalidState("Ride is no longer available".to_string())
        }
    }

    async fn claim(&self, identity: &Identity, ride_id: &str) -> Result<ClaimedRide, ServiceError> {
        let user = self.accounts.ensure_user(identity).await?;
        let ride = self.get(identity, ride_id).await?;
        if user.credits < CLAIM_COST {
            return Err(ServiceError::InsufficientCredits);
        }
        if !ride.status.can_transition_to(RideStatus::Claimed) || ride.creator_id == user.id {
            return Err(Self::claim_refusal(&ride, &user.id));
        }

        let outcome = self
            .rides
            .claim_ride(ride_id, &user.id, CLAIM_COST)
            .await
            .map_err(ServiceError::repository("RideRepository"))?;

        match outcome {
            ClaimOutcome::Claimed { ride, credits } => {
                log::info!("Ride {} claimed by {}.", ride.id, user.id);
                log_activity(
                    self.activity.as_ref(),
                    &user.id,
                    ActionType::RideClaimed,
                    &format!("Claimed {} → {}", ride.pickup_address, ride.dropoff_address),
                    Some(&ride.id),
                )
                .await;
                Ok(ClaimedRide { ride, credits })
            }
            ClaimOutcome::InsufficientCredits => Err(ServiceError::InsufficientCredits),
            ClaimOutcome::RideUnavailable => {
                let current = self.find_ride(ride_id).await?;
                Err(Self::claim_refusal(&current, &user.id))
            }
        }
    }

    async fn complete(
        &self,
        identity: &Identity,
        ride_id: &str,
    ) -> Result<CompletedRide, ServiceError> {
        let ride = self.get(identity, ride_id).await?;
        if !ride.status.can_transition_to(RideStatus::Completed) {
            return Err(ServiceError::InvalidState(format!(
                "Ride is {}, only CLAIMED rides can be completed",
                ride.status.as_str()
            )));
        }
        if ride.picker_id.as_deref() != Some(identity.user_id.as_str()) {
            return Err(ServiceError::Forbidden(
                "Only the picker can complete this ride".to_string(),
            ));
        }

        let bonus = completion_bonus(ride.visibility);
        let completed = self
            .rides
            .complete_ride(ride_id, &identity.user_id, bonus)
            .await
            .map_err(ServiceError::repository("RideRepository"))?
            .ok_or_else(|| ServiceError::InvalidState("Ride is no longer claimed".to_string()))?;
        log::info!("Ride {} completed by {}.", completed.id, identity.user_id);

        log_activity(
            self.activity.as_ref(),
            &identity.user_id,
            ActionType::RideCompleted,
            &format!(
                "Completed {} → {}",
                completed.pickup_address, completed.dropoff_address
            ),
            Some(&completed.id),
        )
        .await;
        self.evaluator.evaluate_quietly(&completed.creator_id).await;
        let new_badges = self.evaluator.evaluate_quietly(&identity.user_id).await;

        Ok(CompletedRide {
            ride: completed,
            new_badges,
        })
    }

    async fn delete(&self, identity: &Identity, ride_id: &str) -> Result<(), ServiceError> {
        let ride = self.get(identity, ride_id).await?;
        if ride.creator_id != identity.user_id {
            return Err(ServiceError::Forbidden(
                "Only the creator can delete this ride".to_string(),
            ));
        }

        let deleted = self
            .rides
            .delete_ride(ride_id, &identity.user_id)
            .await
            .map_err(ServiceError::repository("RideRepository"))?;
        if !deleted {
            return Err(ServiceError::NotFound(format!("Ride {}", ride_id)));
        }
        log::info!(
            "Ride {} deleted by its creator while {}.",
            ride_id,
            ride.status.as_str()
        );

        Ok(())
    }

    async fn my_rides(&self, identity: &Identity, kind: MyRidesKind) -> Result<Vec<Ride>, ServiceError> {
        self.rides
            .my_rides(&identity.user_id, kind)
            .await
            .map_err(ServiceError::repository("RideRepository"))
    }
}

#[async_trait]
impl RequestHandler<RideRequest> for RideRequestHandler {
    async fn handle_request(&self, request: RideRequest) {
        match request {
            RideRequest::Publish {
                identity,
                ride,
                response,
            } => {
                let _ = response.send(self.publish(&identity, ride).await);
            }
            RideRequest::List {
                identity,
                filter,
                response,
            } => {
                let _ = response.send(self.list(&identity, filter).await);
            }
            RideRequest::Get {
                identity,
                ride_id,
                response,
            } => {
                let _ = response.send(self.get(&identity, &ride_id).await);
            }
            RideRequest::Claim {
                identity,
                ride_id,
                response,
            } => {
                let _ = response.send(self.claim(&identity, &ride_id).await);
            }
            RideRequest::Complete {
                identity,
                ride_id,
                response,
            } => {
                let _ = response.send(self.complete(&identity, &ride_id).await);
            }
            RideRequest::Delete {
                identity,
                ride_id,
                response,
            } => {
                let _ = response.send(self.delete(&identity, &ride_id).await);
            }
            RideRequest::MyRides {
                identity,
                kind,
                response,
            } => {
                let _ = response.send(self.my_rides(&identity, kind).await);
            }
        }
    }
}

pub struct RideService;

impl RideService {
    pub fn new() -> Self {
        RideService {}
    }
}

#[async_trait]
impl Service<RideRequest, RideRequestHandler> for RideService {}
