use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "planning_event_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Ride,
    Break,
    Maintenance,
    Personal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "planning_event_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl EventStatus {
    /// Only active events occupy the calendar.
    pub fn is_active(self) -> bool {
        matches!(self, EventStatus::Scheduled | EventStatus::InProgress)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct PlanningEvent {
    pub id: String,
    pub driver_id: String,
    pub event_type: EventType,
    pub title: String,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub ride_source: Option<String>,
    pub personal_ride_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: EventStatus,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewPlanningEvent {
    pub event_type: EventType,
    pub title: String,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub ride_source: Option<String>,
    pub personal_ride_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub status: EventStatus,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PlanningEventUpdate {
    pub event_type: Option<EventType>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub ride_source: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<EventStatus>,
    pub reminder_sent: Option<bool>,
}

impl PlanningEventUpdate {
    pub fn apply(self, event: &mut PlanningEvent) {
        if let Some(event_type) = self.event_type {
            event.event_type = event_type;
        }
        if let Some(title) = self.title {
            event.title = title;
        }
        if self.notes.is_some() {
            event.notes = self.notes;
        }
        if self.location.is_some() {
            event.location = self.location;
        }
        if self.ride_source.is_some() {
            event.ride_source = self.ride_source;
        }
        if let Some(start_time) = self.start_time {
            event.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            event.end_time = end_time;
        }
        if let Some(status) = self.status {
            event.status = status;
        }
        if let Some(reminder_sent) = self.reminder_sent {
            event.reminder_sent = reminder_sent;
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventWindow {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConflictQuery {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude_event_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConflictReport {
    pub has_conflicts: bool,
    pub conflicts: Vec<PlanningEvent>,
}

/// Outcome of a create or update: either the stored event, or the events
/// that prevented it from being stored.
#[derive(Clone, Debug)]
pub enum EventOutcome {
    Saved(PlanningEvent),
    Conflicts(Vec<PlanningEvent>),
}
