use axum::extract::State;

use super::extract::{Json, Query};
use super::{dispatch, AppState, CurrentUser};
use crate::models::activity::{ActivityEntry, ActivityQuery};
use crate::services::activity::ActivityRequest;
use crate::services::ServiceError;

pub async fn get_activity(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, ServiceError> {
    let entries = dispatch(&state.activity_channel, |response| ActivityRequest::Recent {
        user_id: identity.user_id,
        limit: query.limit,
        response,
    })
    .await?;

    Ok(Json(entries))
}
