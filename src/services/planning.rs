use super::auth::Identity;
use super::{RequestHandler, Service, ServiceError};

use crate::models::planning::{
    ConflictQuery, ConflictReport, EventOutcome, EventWindow, NewPlanningEvent, PlanningEvent,
    PlanningEventUpdate,
};
use crate::repositories::planning::PlanningRepository;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

mod conflicts;

pub enum PlanningRequest {
    List {
        identity: Identity,
        window: EventWindow,
        response: oneshot::Sender<Result<Vec<PlanningEvent>, ServiceError>>,
    },
    Get {
        identity: Identity,
        event_id: String,
        response: oneshot::Sender<Result<PlanningEvent, ServiceError>>,
    },
    Create {
        identity: Identity,
        event: NewPlanningEvent,
        response: oneshot::Sender<Result<EventOutcome, ServiceError>>,
    },
    Update {
        identity: Identity,
        event_id: String,
        update: PlanningEventUpdate,
        response: oneshot::Sender<Result<EventOutcome, ServiceError>>,
    },
    Delete {
        identity: Identity,
        event_id: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    Conflicts {
        identity: Identity,
        query: ConflictQuery,
        response: oneshot::Sender<Result<ConflictReport, ServiceError>>,
    },
}

fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ServiceError> {
    if end < start {
        return Err(ServiceError::InvalidInput(
            "end_time must not be before start_time".to_string(),
        ));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), ServiceError> {
    if title.trim().is_empty() {
        return Err(ServiceError::InvalidInput("title is required".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PlanningRequestHandler {
    repository: Arc<dyn PlanningRepository>,
}

impl PlanningRequestHandler {
    pub fn new(repository: Arc<dyn PlanningRepository>) -> Self {
        PlanningRequestHandler { repository }
    }

    async fn find_conflicts(
        &self,
        driver_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<&str>,
    ) -> Result<Vec<PlanningEvent>, ServiceError> {
        let candidates = self
            .repository
            .active_events_between(driver_id, start, end)
            .await
            .map_err(ServiceError::repository("PlanningRepository"))?;

        Ok(conflicts::find_conflicts(
            &candidates,
            driver_id,
            start,
            end,
            exclude,
        ))
    }

    async fn list(
        &self,
        identity: &Identity,
        window: EventWindow,
    ) -> Result<Vec<PlanningEvent>, ServiceError> {
        if let (Some(start), Some(end)) = (window.start_date, window.end_date) {
            validate_interval(start, end)?;
        }

        self.repository
            .list_events(&identity.user_id, &window)
            .await
            .map_err(ServiceError::repository("PlanningRepository"))
    }

    async fn get(&self, identity: &Identity, event_id: &str) -> Result<PlanningEvent, ServiceError> {
        self.repository
            .get_event(event_id)
            .await
            .map_err(ServiceError::repository("PlanningRepository"))?
            .filter(|event| event.driver_id == identity.user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Planning event {}", event_id)))
    }

    async fn create(
        &self,
        identity: &Identity,
        event: NewPlanningEvent,
    ) -> Result<EventOutcome, ServiceError> {
        validate_title(&event.title)?;
        validate_interval(event.start_time, event.end_time)?;

        if event.status.is_active() {
            let conflicts = self
                .find_conflicts(&identity.user_id, event.start_time, event.end_time, None)
                .await?;
            if !conflicts.is_empty() {
                log::debug!(
                    "Event for {} refused, {} conflict(s).",
                    identity.user_id,
                    conflicts.len()
                );
                return Ok(EventOutcome::Conflicts(conflicts));
            }
        }

        let stored = self
            .repository
            .insert_event(&identity.user_id, &event)
            .await
            .map_err(ServiceError::repository("PlanningRepository"))?;

        Ok(EventOutcome::Saved(stored))
    }

    async fn update(
        &self,
        identity: &Identity,
        event_id: &str,
        update: PlanningEventUpdate,
    ) -> Result<EventOutcome, ServiceError> {
        let mut event = self.get(identity, event_id).await?;
        update.apply(&mut event);
        validate_title(&event.title)?;
        validate_interval(event.start_time, event.end_time)?;

        if event.status.is_active() {
            let conflicts = self
                .find_conflicts(
                    &identity.user_id,
                    event.start_time,
                    event.end_time,
                    Some(event_id),
                )
                .await?;
            if !conflicts.is_empty() {
                return Ok(EventOutcome::Conflicts(conflicts));
            }
        }

        let stored = self
            .repository
            .update_event(&event)
            .await
            .map_err(ServiceError::repository("PlanningRepository"))?;

        Ok(EventOutcome::Saved(stored))
    }

    async fn delete(&self, identity: &Identity, event_id: &str) -> Result<(), ServiceError> {
        let deleted = self
            .repository
            .delete_event(event_id, &identity.user_id)
            .await
            .map_err(ServiceError::repository("PlanningRepository"))?;
        if !deleted {
            return Err(ServiceError::NotFound(format!("Planning event {}", event_id)));
        }
        Ok(())
    }

    async fn conflicts(
        &self,
        identity: &Identity,
        query: ConflictQuery,
    ) -> Result<ConflictReport, ServiceError> {
        validate_interval(query.start_time, query.end_time)?;
        let conflicts = self
            .find_conflicts(
                &identity.user_id,
                query.start_time,
                query.end_time,
                query.exclude_event_id.as_deref(),
            )
            .await?;

        Ok(ConflictReport {
            has_conflicts: !conflicts.is_empty(),
            conflicts,
        })
    }
}

#[async_trait]
impl RequestHandler<PlanningRequest> for PlanningRequestHandler {
    async fn handle_request(&self, request: PlanningRequest) {
        match request {
            PlanningRequest::List {
                identity,
                window,
                response,
            } => {
                let _ = response.send(self.list(&identity, window).await);
            }
            PlanningRequest::Get {
                identity,
                event_id,
                response,
            } => {
                let _ = response.send(self.get(&identity, &event_id).await);
            }
            PlanningRequest::Create {
                identity,
                event,
                response,
            } => {
                let _ = response.send(self.create(&identity, event).await);
            }
            PlanningRequest::Update {
                identity,
                event_id,
                update,
                response,
            } => {
                let _ = response.send(self.update(&identity, &event_id, update).await);
            }
            PlanningRequest::Delete {
                identity,
                event_id,
                response,
            } => {
                let _ = response.send(self.delete(&identity, &event_id).await);
            }
            PlanningRequest::Conflicts {
                identity,
                query,
                response,
            } => {
                let _ = response.send(self.conflicts(&identity, query).await);
            }
        }
    }
}

pub struct PlanningService;

impl PlanningService {
    pub fn new() -> Self {
        PlanningService {}
    }
}

#[async_trait]
impl Service<PlanningRequest, PlanningRequestHandler> for PlanningService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::planning::{EventStatus, EventType};
    use crate::repositories::memory::MemoryStore;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 14, hour, minute, 0).unwrap()
    }

    fn driver(user_id: &str) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            email: None,
        }
    }

    fn new_event(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> NewPlanningEvent {
        NewPlanningEvent {
            event_type: EventType::Ride,
            title: title.to_string(),
            notes: None,
            location: Some("Orly".to_string()),
            ride_source: Some("UBER".to_string()),
            personal_ride_id: None,
            start_time: start,
            end_time: end,
            status: EventStatus::Scheduled,
        }
    }

    async fn saved(handler: &PlanningRequestHandler, who: &str, event: NewPlanningEvent) -> PlanningEvent {
        match handler.create(&driver(who), event).await.unwrap() {
            EventOutcome::Saved(event) => event,
            EventOutcome::Conflicts(conflicts) => panic!("unexpected conflicts: {:?}", conflicts),
        }
    }

    #[tokio::test]
    async fn overlapping_creation_is_refused_softly() {
        let handler = PlanningRequestHandler::new(Arc::new(MemoryStore::new()));
        let existing = saved(&handler, "d1", new_event("CDG run", at(10, 30), at(11, 30))).await;

        match handler
            .create(&driver("d1"), new_event("Orly run", at(10, 0), at(11, 0)))
            .await
            .unwrap()
        {
            EventOutcome::Conflicts(conflicts) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].id, existing.id);
            }
            EventOutcome::Saved(_) => panic!("overlapping event was stored"),
        }

        saved(&handler, "d1", new_event("Back to back", at(11, 30), at(12, 0))).await;
        saved(&handler, "d2", new_event("Other driver", at(10, 0), at(11, 0))).await;

        let mut cancelled = new_event("Cancelled", at(10, 0), at(11, 0));
        cancelled.status = EventStatus::Cancelled;
        saved(&handler, "d1", cancelled).await;
    }

    #[tokio::test]
    async fn conflict_query_matches_the_detector() {
        let handler = PlanningRequestHandler::new(Arc::new(MemoryStore::new()));
        let overlapping = saved(&handler, "d1", new_event("A", at(10, 30), at(11, 30))).await;
        saved(&handler, "d1", new_event("B", at(11, 30), at(12, 30))).await;

        let report = handler
            .conflicts(
                &driver("d1"),
                ConflictQuery {
                    start_time: at(10, 0),
                    end_time: at(11, 0),
                    exclude_event_id: None,
                },
            )
            .await
            .unwrap();
        assert!(report.has_conflicts);
        assert_eq!(report.conflicts.len(), 1);

        let report = handler
            .conflicts(
                &driver("d1"),
                ConflictQuery {
                    start_time: at(10, 0),
                    end_time: at(11, 0),
                    exclude_event_id: Some(overlapping.id),
                },
            )
            .await
            .unwrap();
        assert!(!report.has_conflicts);
    }

    #[tokio::test]
    async fn update_checks_conflicts_against_other_events() {
        let handler = PlanningRequestHandler::new(Arc::new(MemoryStore::new()));
        let first = saved(&handler, "d1", new_event("A", at(9, 0), at(10, 0))).await;
        saved(&handler, "d1", new_event("B", at(11, 0), at(12, 0))).await;

        let stretched = handler
            .update(
                &driver("d1"),
                &first.id,
                PlanningEventUpdate {
                    end_time: Some(at(10, 30)),
                    ..PlanningEventUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(stretched, EventOutcome::Saved(ref e) if e.end_time == at(10, 30)));

        let clash = handler
            .update(
                &driver("d1"),
                &first.id,
                PlanningEventUpdate {
                    end_time: Some(at(11, 30)),
                    ..PlanningEventUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(clash, EventOutcome::Conflicts(ref c) if c.len() == 1));
        assert_eq!(handler.get(&driver("d1"), &first.id).await.unwrap().end_time, at(10, 30));
    }

    #[tokio::test]
    async fn reversed_intervals_are_rejected() {
        let handler = PlanningRequestHandler::new(Arc::new(MemoryStore::new()));

        assert!(matches!(
            handler
                .create(&driver("d1"), new_event("Backwards", at(11, 0), at(10, 0)))
                .await,
            Err(ServiceError::InvalidInput(_))
        ));
        saved(&handler, "d1", new_event("Instant", at(10, 0), at(10, 0))).await;
    }

    #[tokio::test]
    async fn events_belong_to_their_driver() {
        let handler = PlanningRequestHandler::new(Arc::new(MemoryStore::new()));
        let event = saved(&handler, "d1", new_event("A", at(9, 0), at(10, 0))).await;
        saved(&handler, "d1", new_event("B", at(14, 0), at(15, 0))).await;

        assert!(matches!(
            handler.get(&driver("d2"), &event.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            handler.delete(&driver("d2"), &event.id).await,
            Err(ServiceError::NotFound(_))
        ));

        let morning = handler
            .list(
                &driver("d1"),
                EventWindow {
                    start_date: Some(at(8, 0)),
                    end_date: Some(at(12, 0)),
                },
            )
            .await
            .unwrap();
        assert_eq!(morning.len(), 1);
        assert_eq!(morning[0].id, event.id);

        handler.delete(&driver("d1"), &event.id).await.unwrap();
        assert!(handler.get(&driver("d1"), &event.id).await.is_err());
    }
}
