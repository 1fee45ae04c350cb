use axum::{extract::State, http::StatusCode};

use super::extract::{Json, Path, Query};
use super::{dispatch, AppState, CurrentUser};
use crate::models::rides::{
    ClaimedRide, CompletedRide, MyRidesQuery, NewRide, PublishedRide, Ride, RideFilter,
};
use crate::services::rides::RideRequest;
use crate::services::ServiceError;

pub async fn publish_ride(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(ride): Json<NewRide>,
) -> Result<(StatusCode, Json<PublishedRide>), ServiceError> {
    let published = dispatch(&state.ride_channel, |response| RideRequest::Publish {
        identity,
        ride,
        response,
    })
    .await?;

    Ok((StatusCode::CREATED, Json(published)))
}

pub async fn list_rides(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(filter): Query<RideFilter>,
) -> Result<Json<Vec<Ride>>, ServiceError> {
    let rides = dispatch(&state.ride_channel, |response| RideRequest::List {
        identity,
        filter,
        response,
    })
    .await?;

    Ok(Json(rides))
}

pub async fn get_ride(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ride_id): Path<String>,
) -> Result<Json<Ride>, ServiceError> {
    let ride = dispatch(&state.ride_channel, |response| RideRequest::Get {
        identity,
        ride_id,
        response,
    })
    .await?;

    Ok(Json(ride))
}

pub async fn claim_ride(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ride_id): Path<String>,
) -> Result<Json<ClaimedRide>, ServiceError> {
    let claimed = dispatch(&state.ride_channel, |response| RideRequest::Claim {
        identity,
        ride_id,
        response,
    })
    .await?;

    Ok(Json(claimed))
}

pub async fn complete_ride(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ride_id): Path<String>,
) -> Result<Json<CompletedRide>, ServiceError> {
    let completed = dispatch(&state.ride_channel, |response| RideRequest::Complete {
        identity,
        ride_id,
        response,
    })
    .await?;

    Ok(Json(completed))
}

pub async fn delete_ride(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ride_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    dispatch(&state.ride_channel, |response| RideRequest::Delete {
        identity,
        ride_id,
        response,
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn my_rides(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<MyRidesQuery>,
) -> Result<Json<Vec<Ride>>, ServiceError> {
    let rides = dispatch(&state.ride_channel, |response| RideRequest::MyRides {
        identity,
        kind: query.kind,
        response,
    })
    .await?;

    Ok(Json(rides))
}
