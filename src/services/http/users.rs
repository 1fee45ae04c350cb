use axum::extract::State;

use super::extract::{Json, Path};
use super::{dispatch, AppState, CurrentUser};
use crate::models::users::{User, VerificationRequest, VerificationReview};
use crate::services::users::UserRequest;
use crate::services::ServiceError;

pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<User>, ServiceError> {
    let user = dispatch(&state.user_channel, |response| UserRequest::Profile {
        identity,
        response,
    })
    .await?;

    Ok(Json(user))
}

pub async fn submit_verification(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(request): Json<VerificationRequest>,
) -> Result<Json<User>, ServiceError> {
    let user = dispatch(&state.user_channel, |response| {
        UserRequest::SubmitVerification {
            identity,
            request,
            response,
        }
    })
    .await?;

    Ok(Json(user))
}

pub async fn get_pending_verifications(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<User>>, ServiceError> {
    let pending = dispatch(&state.user_channel, |response| {
        UserRequest::PendingVerifications { identity, response }
    })
    .await?;

    Ok(Json(pending))
}

pub async fn review_verification(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(user_id): Path<String>,
    Json(review): Json<VerificationReview>,
) -> Result<Json<User>, ServiceError> {
    let user = dispatch(&state.user_channel, |response| {
        UserRequest::ReviewVerification {
            identity,
            user_id,
            review,
            response,
        }
    })
    .await?;

    Ok(Json(user))
}
