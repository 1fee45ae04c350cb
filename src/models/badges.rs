use chrono::{DateTime, Utc};
use serde::Serialize;

pub const FIRST_RIDE: &str = "first-ride";
pub const FIVE_RIDES: &str = "5-rides";
pub const SERIAL_PUBLISHER: &str = "serial-publisher";
pub const HUNDRED_RIDES: &str = "100-rides";
pub const HUNDRED_COMPLETED: &str = "100-completed";
pub const THOUSAND_CREDITS: &str = "1000-credits";
pub const EARLY_ADOPTER: &str = "early-adopter";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub rarity: Rarity,
}

pub static BADGE_CATALOG: [Badge; 7] = [
    Badge {
        id: FIRST_RIDE,
        name: "Première course",
        description: "Publish your first ride on the marketplace.",
        icon: "car",
        color: "#10b981",
        rarity: Rarity::Common,
    },
    Badge {
        id: FIVE_RIDES,
        name: "Habitué",
        description: "Publish 5 rides.",
        icon: "repeat",
        color: "#3b82f6",
        rarity: Rarity::Common,
    },
    Badge {
        id: SERIAL_PUBLISHER,
        name: "Publieur en série",
        description: "Publish 25 rides.",
        icon: "megaphone",
        color: "#8b5cf6",
        rarity: Rarity::Rare,
    },
    Badge {
        id: HUNDRED_RIDES,
        name: "Centurion",
        description: "Publish 100 rides.",
        icon: "trophy",
        color: "#f59e0b",
        rarity: Rarity::Epic,
    },
    Badge {
        id: HUNDRED_COMPLETED,
        name: "Infatigable",
        description: "Complete 100 rides claimed from the marketplace.",
        icon: "flag",
        color: "#ef4444",
        rarity: Rarity::Epic,
    },
    Badge {
        id: THOUSAND_CREDITS,
        name: "Millionnaire",
        description: "Hold 1000 credits.",
        icon: "diamond",
        color: "#ff6b47",
        rarity: Rarity::Legendary,
    },
    Badge {
        id: EARLY_ADOPTER,
        name: "Pionnier",
        description: "Joined Corail during the launch period.",
        icon: "rocket",
        color: "#0ea5e9",
        rarity: Rarity::Rare,
    },
];

pub fn find_badge(id: &str) -> Option<&'static Badge> {
    BADGE_CATALOG.iter().find(|badge| badge.id == id)
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct UserBadge {
    pub user_id: String,
    pub badge_id: String,
    pub earned_at: DateTime<Utc>,
}

/// An award joined with its catalog entry.
#[derive(Clone, Debug, Serialize)]
pub struct EarnedBadge {
    #[serde(flatten)]
    pub badge: Badge,
    pub earned_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserStats {
    pub published: i64,
    pub completed_as_picker: i64,
    pub credits: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct BadgeAward {
    pub awarded: bool,
    pub badge: Badge,
}
