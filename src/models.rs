pub mod activity;
pub mod badges;
pub mod groups;
pub mod notifications;
pub mod personal_rides;
pub mod planning;
pub mod rides;
pub mod users;
