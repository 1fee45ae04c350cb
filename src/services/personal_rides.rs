use super::activity::log_activity;
use super::auth::Identity;
use super::{RequestHandler, Service, ServiceError};

use crate::models::activity::ActionType;
use crate::models::personal_rides::{
    NewPersonalRide, PersonalRide, PersonalRideQuery, PersonalRideStats, PersonalRideStatus,
    PersonalRideUpdate, RideSource, SourceStats,
};
use crate::repositories::activity::ActivityRepository;
use crate::repositories::personal_rides::PersonalRideRepository;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::oneshot;

pub const MAX_LIMIT: i64 = 100;

pub enum PersonalRideRequest {
    List {
        identity: Identity,
        query: PersonalRideQuery,
        response: oneshot::Sender<Result<Vec<PersonalRide>, ServiceError>>,
    },
    Get {
        identity: Identity,
        ride_id: String,
        response: oneshot::Sender<Result<PersonalRide, ServiceError>>,
    },
    Create {
        identity: Identity,
        ride: NewPersonalRide,
        response: oneshot::Sender<Result<PersonalRide, ServiceError>>,
    },
    Update {
        identity: Identity,
        ride_id: String,
        update: PersonalRideUpdate,
        response: oneshot::Sender<Result<PersonalRide, ServiceError>>,
    },
    Delete {
        identity: Identity,
        ride_id: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    Stats {
        identity: Identity,
        response: oneshot::Sender<Result<PersonalRideStats, ServiceError>>,
    },
}

fn accumulate(stats: &mut SourceStats, ride: &PersonalRide) {
    stats.total_rides += 1;
    if ride.status == PersonalRideStatus::Completed {
        stats.completed_rides += 1;
    }
    stats.revenue_cents += ride.price_cents.unwrap_or(0);
    stats.total_distance_km += ride.distance_km.unwrap_or(0.0);
}

fn finish(mut stats: SourceStats) -> SourceStats {
    if stats.total_rides > 0 {
        stats.avg_price_cents = stats.revenue_cents as f64 / stats.total_rides as f64;
    }
    stats
}

/// Per-source and overall totals. Sources are listed in declaration order.
pub fn summarize(rides: &[PersonalRide]) -> PersonalRideStats {
    let mut by_source: BTreeMap<RideSource, SourceStats> = BTreeMap::new();
    let mut totals = SourceStats::default();

    for ride in rides {
        let entry = by_source.entry(ride.source).or_insert_with(|| SourceStats {
            source: Some(ride.source),
            ..SourceStats::default()
        });
        accumulate(entry, ride);
        accumulate(&mut totals, ride);
    }

    PersonalRideStats {
        by_source: by_source.into_values().map(finish).collect(),
        totals: finish(totals),
    }
}

fn validate_addresses(pickup: &str, dropoff: &str) -> Result<(), ServiceError> {
    if pickup.trim().is_empty() || dropoff.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "pickup_address and dropoff_address are required".to_string(),
        ));
    }
    Ok(())
}

fn validate_amounts(
    price_cents: Option<i64>,
    distance_km: Option<f64>,
    duration_minutes: Option<i32>,
) -> Result<(), ServiceError> {
    if price_cents.is_some_and(|price| price < 0)
        || distance_km.is_some_and(|km| km < 0.0)
        || duration_minutes.is_some_and(|minutes| minutes < 0)
    {
        return Err(ServiceError::InvalidInput(
            "price, distance and duration must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// Applies the provided fields. A status change must follow the personal
/// ride lifecycle; entering COMPLETED stamps `completed_at`.
pub fn apply_update(
    ride: &mut PersonalRide,
    update: PersonalRideUpdate,
) -> Result<(), ServiceError> {
    if let Some(status) = update.status {
        if !ride.status.can_transition_to(status) {
            return Err(ServiceError::InvalidState(format!(
                "Cannot move a personal ride from {:?} to {:?}",
                ride.status, status
            )));
        }
        if status == PersonalRideStatus::Completed && ride.status != status {
            ride.completed_at = Some(Utc::now());
        }
        ride.status = status;
    }

    if let Some(source) = update.source {
        ride.source = source;
    }
    if let Some(pickup_address) = update.pickup_address {
        ride.pickup_address = pickup_address;
    }
    if let Some(dropoff_address) = update.dropoff_address {
        ride.dropoff_address = dropoff_address;
    }
    if update.scheduled_at.is_some() {
        ride.scheduled_at = update.scheduled_at;
    }
    if update.price_cents.is_some() {
        ride.price_cents = update.price_cents;
    }
    if update.distance_km.is_some() {
        ride.distance_km = update.distance_km;
    }
    if update.duration_minutes.is_some() {
        ride.duration_minutes = update.duration_minutes;
    }
    if update.client_name.is_some() {
        ride.client_name = update.client_name;
    }
    if update.client_phone.is_some() {
        ride.client_phone = update.client_phone;
    }
    if update.notes.is_some() {
        ride.notes = update.notes;
    }

    validate_addresses(&ride.pickup_address, &ride.dropoff_address)?;
    validate_amounts(ride.price_cents, ride.distance_km, ride.duration_minutes)
}

#[derive(Clone)]
pub struct PersonalRideRequestHandler {
    repository: Arc<dyn PersonalRideRepository>,
    activity: Arc<dyn ActivityRepository>,
}

impl PersonalRideRequestHandler {
    pub fn new(
        repository: Arc<dyn PersonalRideRepository>,
        activity: Arc<dyn ActivityRepository>,
    ) -> Self {
        PersonalRideRequestHandler {
            repository,
            activity,
        }
    }

    async fn list(
        &self,
        identity: &Identity,
        query: PersonalRideQuery,
    ) -> Result<Vec<PersonalRide>, ServiceError> {
        if query.limit.is_some_and(|limit| !(1..=MAX_LIMIT).contains(&limit)) {
            return Err(ServiceError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }

        self.repository
            .list(&identity.user_id, &query)
            .await
            .map_err(ServiceError::repository("PersonalRideRepository"))
    }

    async fn get(&self, identity: &Identity, ride_id: &str) -> Result<PersonalRide, ServiceError> {
        self.repository
            .get(ride_id)
            .await
            .map_err(ServiceError::repository("PersonalRideRepository"))?
            .filter(|ride| ride.driver_id == identity.user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Personal ride {}", ride_id)))
    }

    async fn create(
        &self,
        identity: &Identity,
        ride: NewPersonalRide,
    ) -> Result<PersonalRide, ServiceError> {
        validate_addresses(&ride.pickup_address, &ride.dropoff_address)?;
        validate_amounts(ride.price_cents, ride.distance_km, ride.duration_minutes)?;

        let ride = self
            .repository
            .insert(&identity.user_id, &ride)
            .await
            .map_err(ServiceError::repository("PersonalRideRepository"))?;

        log_activity(
            self.activity.as_ref(),
            &identity.user_id,
            ActionType::PersonalRideAdded,
            &format!("Added {:?} ride {} → {}", ride.source, ride.pickup_address, ride.dropoff_address),
            None,
        )
        .await;

        Ok(ride)
    }

    async fn update(
        &self,
        identity: &Identity,
        ride_id: &str,
        update: PersonalRideUpdate,
    ) -> Result<PersonalRide, ServiceError> {
        let mut ride = self.get(identity, ride_id).await?;
        apply_update(&mut ride, update)?;

        self.repository
            .update(&ride)
            .await
            .map_err(ServiceError::repository("PersonalRideRepository"))
    }

    async fn delete(&self, identity: &Identity, ride_id: &str) -> Result<(), ServiceError> {
        let deleted = self
            .repository
            .delete(ride_id, &identity.user_id)
            .await
            .map_err(ServiceError::repository("PersonalRideRepository"))?;
        if !deleted {
            return Err(ServiceError::NotFound(format!("Personal ride {}", ride_id)));
        }
        Ok(())
    }

    async fn stats(&self, identity: &Identity) -> Result<PersonalRideStats, ServiceError> {
        let rides = self
            .repository
            .list(&identity.user_id, &PersonalRideQuery::default())
            .await
            .map_err(ServiceError::repository("PersonalRideRepository"))?;

        Ok(summarize(&rides))
    }
}

#[async_trait]
impl RequestHandler<PersonalRideRequest> for PersonalRideRequestHandler {
    async fn handle_request(&self, request: PersonalRideRequest) {
        match request {
            PersonalRideRequest::List {
                identity,
                query,
                response,
            } => {
                let _ = response.send(self.list(&identity, query).await);
            }
            PersonalRideRequest::Get {
                identity,
                ride_id,
                response,
            } => {
                let _ = response.send(self.get(&identity, &ride_id).await);
            }
            PersonalRideRequest::Create {
                identity,
                ride,
                response,
            } => {
                let _ = response.send(self.create(&identity, ride).await);
            }
            PersonalRideRequest::Update {
                identity,
                ride_id,
                update,
                response,
            } => {
                let _ = response.send(self.update(&identity, &ride_id, update).await);
            }
            PersonalRideRequest::Delete {
                identity,
                ride_id,
                response,
            } => {
                let _ = response.send(self.delete(&identity, &ride_id).await);
            }
            PersonalRideRequest::Stats { identity, response } => {
                let _ = response.send(self.stats(&identity).await);
            }
        }
    }
}

pub struct PersonalRideService;

impl PersonalRideService {
    pub fn new() -> Self {
        PersonalRideService {}
    }
}

#[async_trait]
impl Service<PersonalRideRequest, PersonalRideRequestHandler> for PersonalRideService {}
