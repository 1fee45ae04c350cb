use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "verification_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Unverified,
    Pending,
    Verified,
    Rejected,
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub siren: Option<String>,
    pub professional_card_number: Option<String>,
    pub credits: i64,
    pub verification_status: VerificationStatus,
    pub verification_submitted_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "credit_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditKind {
    PublishRide,
    ClaimRide,
    CompleteRideBonus,
    Manual,
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct CreditTransaction {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub kind: CreditKind,
    pub ride_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreditBalance {
    pub credits: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VerificationRequest {
    pub full_name: String,
    pub phone: String,
    pub siren: String,
    pub professional_card_number: String,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VerificationReview {
    pub status: VerificationStatus,
    pub rejection_reason: Option<String>,
}
