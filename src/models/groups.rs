use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "member_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Admin,
    Member,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "member_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,
    Pending,
    Rejected,
    Left,
}

impl MemberStatus {
    /// An ACTIVE or PENDING row blocks a new invitation to the same email.
    pub fn blocks_invitation(self) -> bool {
        matches!(self, MemberStatus::Active | MemberStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Active => "ACTIVE",
            MemberStatus::Pending => "PENDING",
            MemberStatus::Rejected => "REJECTED",
            MemberStatus::Left => "LEFT",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Group {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct GroupMember {
    pub id: String,
    pub group_id: String,
    pub user_id: Option<String>,
    pub email: String,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub invited_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupMember {
    pub fn is_active_admin(&self) -> bool {
        self.role == MemberRole::Admin && self.status == MemberStatus::Active
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct GroupSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub group: Group,
    pub member_count: i64,
    pub role: MemberRole,
}

#[derive(Clone, Debug, Serialize)]
pub struct GroupDetails {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<GroupMember>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Invitation {
    pub email: String,
}

/// Normalized form used as the membership key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
