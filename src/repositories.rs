use std::sync::Arc;

use sqlx::PgPool;

pub mod activity;
pub mod badges;
pub mod groups;
#[cfg(test)]
pub mod memory;
pub mod notifications;
pub mod personal_rides;
pub mod planning;
pub mod rides;
pub mod users;

/// Store handles shared by every request handler.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn users::UserRepository>,
    pub rides: Arc<dyn rides::RideRepository>,
    pub badges: Arc<dyn badges::BadgeRepository>,
    pub groups: Arc<dyn groups::GroupRepository>,
    pub planning: Arc<dyn planning::PlanningRepository>,
    pub personal_rides: Arc<dyn personal_rides::PersonalRideRepository>,
    pub notifications: Arc<dyn notifications::NotificationRepository>,
    pub activity: Arc<dyn activity::ActivityRepository>,
}

impl Repositories {
    pub fn postgres(conn: PgPool) -> Self {
        Repositories {
            users: Arc::new(users::PgUserRepository::new(conn.clone())),
            rides: Arc::new(rides::PgRideRepository::new(conn.clone())),
            badges: Arc::new(badges::PgBadgeRepository::new(conn.clone())),
            groups: Arc::new(groups::PgGroupRepository::new(conn.clone())),
            planning: Arc::new(planning::PgPlanningRepository::new(conn.clone())),
            personal_rides: Arc::new(personal_rides::PgPersonalRideRepository::new(conn.clone())),
            notifications: Arc::new(notifications::PgNotificationRepository::new(conn.clone())),
            activity: Arc::new(activity::PgActivityRepository::new(conn)),
        }
    }

    #[cfg(test)]
    pub fn memory(store: &memory::MemoryStore) -> Self {
        Repositories {
            users: Arc::new(store.clone()),
            rides: Arc::new(store.clone()),
            badges: Arc::new(store.clone()),
            groups: Arc::new(store.clone()),
            planning: Arc::new(store.clone()),
            personal_rides: Arc::new(store.clone()),
            notifications: Arc::new(store.clone()),
            activity: Arc::new(store.clone()),
        }
    }
}
