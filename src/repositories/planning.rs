use crate::models::planning::{EventWindow, NewPlanningEvent, PlanningEvent};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[async_trait]
pub trait PlanningRepository: Send + Sync {
    async fn list_events(
        &self,
        driver_id: &str,
        window: &EventWindow,
    ) -> Result<Vec<PlanningEvent>, anyhow::Error>;

    async fn get_event(&self, id: &str) -> Result<Option<PlanningEvent>, anyhow::Error>;

    /// SCHEDULED or IN_PROGRESS events of the driver intersecting
    /// `[start, end)`.
    async fn active_events_between(
        &self,
        driver_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PlanningEvent>, anyhow::Error>;

    async fn insert_event(
        &self,
        driver_id: &str,
        event: &NewPlanningEvent,
    ) -> Result<PlanningEvent, anyhow::Error>;

    async fn update_event(&self, event: &PlanningEvent) -> Result<PlanningEvent, anyhow::Error>;

    async fn delete_event(&self, id: &str, driver_id: &str) -> Result<bool, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgPlanningRepository {
    conn: PgPool,
}

impl PgPlanningRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl PlanningRepository for PgPlanningRepository {
    async fn list_events(
        &self,
        driver_id: &str,
        window: &EventWindow,
    ) -> Result<Vec<PlanningEvent>, anyhow::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM planning_events WHERE driver_id = ");
        query.push_bind(driver_id);

        if let Some(start_date) = window.start_date {
            query.push(" AND start_time >= ").push_bind(start_date);
        }
        if let Some(end_date) = window.end_date {
            query.push(" AND end_time <= ").push_bind(end_date);
        }
        query.push(" ORDER BY start_time ASC");

        let events = query
            .build_query_as::<PlanningEvent>()
            .fetch_all(&self.conn)
            .await?;

        Ok(events)
    }

    async fn get_event(&self, id: &str) -> Result<Option<PlanningEvent>, anyhow::Error> {
        let event = sqlx::query_as::<_, PlanningEvent>("SELECT * FROM planning_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(event)
    }

    async fn active_events_between(
        &self,
        driver_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PlanningEvent>, anyhow::Error> {
        let events = sqlx::query_as::<_, PlanningEvent>(
            r#"SELECT * FROM planning_events
            WHERE driver_id = $1
              AND status IN ('SCHEDULED', 'IN_PROGRESS')
              AND start_time < $3
              AND $2 < end_time
            ORDER BY start_time ASC"#,
        )
        .bind(driver_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.conn)
        .await?;

        Ok(events)
    }

    async fn insert_event(
        &self,
        driver_id: &str,
        event: &NewPlanningEvent,
    ) -> Result<PlanningEvent, anyhow::Error> {
        let stored = sqlx::query_as::<_, PlanningEvent>(
            r#"INSERT INTO planning_events
            (id, driver_id, event_type, title, notes, location, ride_source,
             personal_ride_id, start_time, end_time, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *"#,
        )
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(driver_id)
        .bind(event.event_type)
        .bind(&event.title)
        .bind(&event.notes)
        .bind(&event.location)
        .bind(&event.ride_source)
        .bind(&event.personal_ride_id)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.status)
        .fetch_one(&self.conn)
        .await?;

        Ok(stored)
    }

    async fn update_event(&self, event: &PlanningEvent) -> Result<PlanningEvent, anyhow::Error> {
        let stored = sqlx::query_as::<_, PlanningEvent>(
            r#"UPDATE planning_events
            SET event_type = $1,
                title = $2,
                notes = $3,
                location = $4,
                ride_source = $5,
                start_time = $6,
                end_time = $7,
                status = $8,
                reminder_sent = $9,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $10 AND driver_id = $11
            RETURNING *"#,
        )
        .bind(event.event_type)
        .bind(&event.title)
        .bind(&event.notes)
        .bind(&event.location)
        .bind(&event.ride_source)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.status)
        .bind(event.reminder_sent)
        .bind(&event.id)
        .bind(&event.driver_id)
        .fetch_one(&self.conn)
        .await?;

        Ok(stored)
    }

    async fn delete_event(&self, id: &str, driver_id: &str) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM planning_events WHERE id = $1 AND driver_id = $2")
            .bind(id)
            .bind(driver_id)
            .execute(&self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
