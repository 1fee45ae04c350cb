use axum::extract::State;

use super::extract::{Json, Path};
use super::{dispatch, AppState, CurrentUser};
use crate::models::badges::{Badge, BadgeAward, EarnedBadge};
use crate::services::badges::BadgeRequest;
use crate::services::ServiceError;

pub async fn get_catalog(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<Vec<Badge>>, ServiceError> {
    let catalog = dispatch(&state.badge_channel, |response| BadgeRequest::Catalog {
        response,
    })
    .await?;

    Ok(Json(catalog))
}

pub async fn get_user_badges(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<EarnedBadge>>, ServiceError> {
    let earned = dispatch(&state.badge_channel, |response| BadgeRequest::UserBadges {
        user_id,
        response,
    })
    .await?;

    Ok(Json(earned))
}

/// Admin only.
pub async fn award_badge(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path((user_id, badge_id)): Path<(String, String)>,
) -> Result<Json<BadgeAward>, ServiceError> {
    let award = dispatch(&state.badge_channel, |response| BadgeRequest::Award {
        identity,
        user_id,
        badge_id,
        response,
    })
    .await?;

    Ok(Json(award))
}
