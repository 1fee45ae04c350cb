use axum::extract::State;

use super::extract::Json;
use super::{dispatch, AppState, CurrentUser};
use crate::models::notifications::{NotificationPreferences, PreferencesUpdate};
use crate::services::notifications::NotificationRequest;
use crate::services::ServiceError;

pub async fn get_preferences(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<NotificationPreferences>, ServiceError> {
    let prefs = dispatch(&state.notification_channel, |response| {
        NotificationRequest::Preferences { identity, response }
    })
    .await?;

    Ok(Json(prefs))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<NotificationPreferences>, ServiceError> {
    let prefs = dispatch(&state.notification_channel, |response| {
        NotificationRequest::UpdatePreferences {
            identity,
            update,
            response,
        }
    })
    .await?;

    Ok(Json(prefs))
}
