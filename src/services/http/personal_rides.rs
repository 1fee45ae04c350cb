use axum::{extract::State, http::StatusCode};

use super::extract::{Json, Path, Query};
use super::{dispatch, AppState, CurrentUser};
use crate::models::personal_rides::{
    NewPersonalRide, PersonalRide, PersonalRideQuery, PersonalRideStats, PersonalRideUpdate,
};
use crate::services::personal_rides::PersonalRideRequest;
use crate::services::ServiceError;

pub async fn create_personal_ride(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(ride): Json<NewPersonalRide>,
) -> Result<(StatusCode, Json<PersonalRide>), ServiceError> {
    let ride = dispatch(&state.personal_ride_channel, |response| {
        PersonalRideRequest::Create {
            identity,
            ride,
            response,
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(ride)))
}

pub async fn list_personal_rides(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<PersonalRideQuery>,
) -> Result<Json<Vec<PersonalRide>>, ServiceError> {
    let rides = dispatch(&state.personal_ride_channel, |response| {
        PersonalRideRequest::List {
            identity,
            query,
            response,
        }
    })
    .await?;

    Ok(Json(rides))
}

pub async fn get_personal_ride(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ride_id): Path<String>,
) -> Result<Json<PersonalRide>, ServiceError> {
    let ride = dispatch(&state.personal_ride_channel, |response| {
        PersonalRideRequest::Get {
            identity,
            ride_id,
            response,
        }
    })
    .await?;

    Ok(Json(ride))
}

pub async fn update_personal_ride(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ride_id): Path<String>,
    Json(update): Json<PersonalRideUpdate>,
) -> Result<Json<PersonalRide>, ServiceError> {
    let ride = dispatch(&state.personal_ride_channel, |response| {
        PersonalRideRequest::Update {
            identity,
            ride_id,
            update,
            response,
        }
    })
    .await?;

    Ok(Json(ride))
}

pub async fn delete_personal_ride(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(ride_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    dispatch(&state.personal_ride_channel, |response| {
        PersonalRideRequest::Delete {
            identity,
            ride_id,
            response,
        }
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_stats(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<PersonalRideStats>, ServiceError> {
    let stats = dispatch(&state.personal_ride_channel, |response| {
        PersonalRideRequest::Stats { identity, response }
    })
    .await?;

    Ok(Json(stats))
}
