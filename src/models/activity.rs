use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "activity_action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    RidePublished,
    RideClaimed,
    RideCompleted,
    PersonalRideAdded,
    BadgeEarned,
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct ActivityEntry {
    pub id: String,
    pub user_id: String,
    pub action_type: ActionType,
    pub description: String,
    pub ride_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}
