use chrono::{DateTime, Utc};

use crate::models::planning::PlanningEvent;

/// Half-open intervals `[s1, e1)` and `[s2, e2)` intersect. Empty intervals
/// intersect nothing.
pub fn overlaps(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e1 && s2 < e2 && s1 < e2 && s2 < e1
}

/// Active events of `driver_id` that intersect `[start, end)`, in start
/// order. `exclude` skips the event being rescheduled.
pub fn find_conflicts<'a, I>(
    candidates: I,
    driver_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<&str>,
) -> Vec<PlanningEvent>
where
    I: IntoIterator<Item = &'a PlanningEvent>,
{
    let mut conflicts: Vec<PlanningEvent> = candidates
        .into_iter()
        .filter(|event| event.driver_id == driver_id)
        .filter(|event| event.status.is_active())
        .filter(|event| exclude != Some(event.id.as_str()))
        .filter(|event| overlaps(start, end, event.start_time, event.end_time))
        .cloned()
        .collect();

    conflicts.sort_by_key(|event| event.start_time);
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::planning::{EventStatus, EventType};
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 14, hour, minute, 0).unwrap()
    }

    fn event(id: &str, driver_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> PlanningEvent {
        PlanningEvent {
            id: id.to_string(),
            driver_id: driver_id.to_string(),
            event_type: EventType::Ride,
            title: format!("Event {}", id),
            notes: None,
            location: None,
            ride_source: None,
            personal_ride_id: None,
            start_time: start,
            end_time: end,
            status: EventStatus::Scheduled,
            reminder_sent: false,
            created_at: start,
            updated_at: start,
        }
    }

    fn ids(events: &[PlanningEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn overlapping_events_conflict_and_neighbours_do_not() {
        let events = vec![
            event("overlap", "d1", at(10, 30), at(11, 30)),
            event("adjacent", "d1", at(11, 0), at(12, 0)),
            event("before", "d1", at(9, 0), at(10, 0)),
            event("other-driver", "d2", at(10, 0), at(11, 0)),
        ];

        let conflicts = find_conflicts(&events, "d1", at(10, 0), at(11, 0), None);
        assert_eq!(ids(&conflicts), vec!["overlap"]);
    }

    #[test]
    fn enclosing_and_enclosed_intervals_conflict() {
        let events = vec![
            event("inside", "d1", at(10, 15), at(10, 45)),
            event("around", "d1", at(9, 0), at(12, 0)),
        ];

        let conflicts = find_conflicts(&events, "d1", at(10, 0), at(11, 0), None);
        assert_eq!(ids(&conflicts), vec!["around", "inside"]);
    }

    #[test]
    fn zero_length_intervals_never_conflict() {
        let events = vec![event("long", "d1", at(9, 0), at(12, 0))];

        assert!(find_conflicts(&events, "d1", at(10, 0), at(10, 0), None).is_empty());
        assert!(!overlaps(at(10, 0), at(10, 0), at(10, 0), at(10, 0)));
        assert!(!overlaps(at(10, 0), at(10, 0), at(9, 0), at(12, 0)));
    }

    #[test]
    fn stored_point_events_do_not_block_a_window() {
        let events = vec![
            event("point", "d1", at(10, 0), at(10, 0)),
            event("real", "d1", at(10, 30), at(11, 30)),
        ];

        let conflicts = find_conflicts(&events, "d1", at(9, 0), at(12, 0), None);
        assert_eq!(ids(&conflicts), vec!["real"]);
        assert!(!overlaps(at(9, 0), at(12, 0), at(10, 0), at(10, 0)));
    }

    #[test]
    fn inactive_and_excluded_events_are_ignored() {
        let mut done = event("done", "d1", at(10, 0), at(11, 0));
        done.status = EventStatus::Completed;
        let mut cancelled = event("cancelled", "d1", at(10, 0), at(11, 0));
        cancelled.status = EventStatus::Cancelled;
        let mut running = event("running", "d1", at(10, 0), at(11, 0));
        running.status = EventStatus::InProgress;
        let events = vec![done, cancelled, running, event("self", "d1", at(10, 0), at(11, 0))];

        let conflicts = find_conflicts(&events, "d1", at(10, 30), at(10, 45), Some("self"));
        assert_eq!(ids(&conflicts), vec!["running"]);
    }
}
