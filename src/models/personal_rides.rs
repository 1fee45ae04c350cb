use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "personal_ride_source", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideSource {
    Uber,
    Bolt,
    DirectClient,
    Marketplace,
    Other,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "personal_ride_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonalRideStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl PersonalRideStatus {
    pub fn can_transition_to(self, next: PersonalRideStatus) -> bool {
        use PersonalRideStatus::*;

        self == next
            || matches!(
                (self, next),
                (Scheduled, InProgress)
                    | (Scheduled, Completed)
                    | (Scheduled, Cancelled)
                    | (InProgress, Completed)
                    | (InProgress, Cancelled)
            )
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct PersonalRide {
    pub id: String,
    pub driver_id: String,
    pub source: RideSource,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub price_cents: Option<i64>,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub status: PersonalRideStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewPersonalRide {
    pub source: RideSource,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub price_cents: Option<i64>,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: PersonalRideStatus,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PersonalRideUpdate {
    pub source: Option<RideSource>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub price_cents: Option<i64>,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub status: Option<PersonalRideStatus>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PersonalRideQuery {
    pub status: Option<PersonalRideStatus>,
    pub limit: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SourceStats {
    pub source: Option<RideSource>,
    pub total_rides: i64,
    pub completed_rides: i64,
    pub revenue_cents: i64,
    pub total_distance_km: f64,
    pub avg_price_cents: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PersonalRideStats {
    pub by_source: Vec<SourceStats>,
    pub totals: SourceStats,
}
