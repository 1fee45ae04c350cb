use axum::{extract::State, http::StatusCode};

use super::extract::{Json, Path};
use super::{dispatch, AppState, CurrentUser};
use crate::models::groups::{Group, GroupDetails, GroupMember, GroupSummary, Invitation, NewGroup};
use crate::services::groups::GroupRequest;
use crate::services::ServiceError;

pub async fn create_group(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(group): Json<NewGroup>,
) -> Result<(StatusCode, Json<Group>), ServiceError> {
    let group = dispatch(&state.group_channel, |response| GroupRequest::Create {
        identity,
        group,
        response,
    })
    .await?;

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_groups(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<GroupSummary>>, ServiceError> {
    let groups = dispatch(&state.group_channel, |response| GroupRequest::List {
        identity,
        response,
    })
    .await?;

    Ok(Json(groups))
}

pub async fn get_group(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<GroupDetails>, ServiceError> {
    let details = dispatch(&state.group_channel, |response| GroupRequest::Get {
        identity,
        group_id,
        response,
    })
    .await?;

    Ok(Json(details))
}

pub async fn invite_member(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(group_id): Path<String>,
    Json(invitation): Json<Invitation>,
) -> Result<(StatusCode, Json<GroupMember>), ServiceError> {
    let member = dispatch(&state.group_channel, |response| GroupRequest::Invite {
        identity,
        group_id,
        invitation,
        response,
    })
    .await?;

    Ok((StatusCode::CREATED, Json(member)))
}
