use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::badges::Badge;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "ride_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Published,
    Claimed,
    Completed,
    Expired,
}

impl RideStatus {
    /// Edges of the ride lifecycle. Deletion is not a status and is handled
    /// separately.
    pub fn can_transition_to(self, next: RideStatus) -> bool {
        matches!(
            (self, next),
            (RideStatus::Published, RideStatus::Claimed)
                | (RideStatus::Claimed, RideStatus::Completed)
                | (RideStatus::Published, RideStatus::Expired)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RideStatus::Published => "PUBLISHED",
            RideStatus::Claimed => "CLAIMED",
            RideStatus::Completed => "COMPLETED",
            RideStatus::Expired => "EXPIRED",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "ride_visibility", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideVisibility {
    Public,
    Group,
    Personal,
}

impl RideVisibility {
    /// Only rides shared with others take part in the credit economy.
    pub fn is_shared(self) -> bool {
        matches!(self, RideVisibility::Public | RideVisibility::Group)
    }
}

impl Default for RideVisibility {
    fn default() -> Self {
        RideVisibility::Public
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Ride {
    pub id: String,
    pub creator_id: String,
    pub picker_id: Option<String>,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub scheduled_at: DateTime<Utc>,
    pub price_cents: i64,
    pub status: RideStatus,
    pub visibility: RideVisibility,
    pub vehicle_type: Option<String>,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub commission_enabled: bool,
    pub group_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

fn default_commission() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewRide {
    pub pickup_address: String,
    pub dropoff_address: String,
    pub scheduled_at: DateTime<Utc>,
    pub price_cents: i64,
    #[serde(default)]
    pub visibility: RideVisibility,
    pub vehicle_type: Option<String>,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<i32>,
    #[serde(default = "default_commission")]
    pub commission_enabled: bool,
    pub group_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RideFilter {
    pub status: Option<RideStatus>,
    pub visibility: Option<RideVisibility>,
    pub group_id: Option<String>,
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MyRidesKind {
    #[default]
    Claimed,
    Published,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MyRidesQuery {
    #[serde(rename = "type", default)]
    pub kind: MyRidesKind,
}

/// Result of the conditional claim update.
#[derive(Clone, Debug)]
pub enum ClaimOutcome {
    Claimed { ride: Ride, credits: i64 },
    RideUnavailable,
    InsufficientCredits,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublishedRide {
    pub ride: Ride,
    pub credits_awarded: i64,
    pub new_badges: Vec<Badge>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClaimedRide {
    pub ride: Ride,
    pub credits: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompletedRide {
    pub ride: Ride,
    pub new_badges: Vec<Badge>,
}
