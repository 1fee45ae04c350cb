use crate::models::personal_rides::{NewPersonalRide, PersonalRide, PersonalRideQuery};

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[async_trait]
pub trait PersonalRideRepository: Send + Sync {
    async fn list(
        &self,
        driver_id: &str,
        query: &PersonalRideQuery,
    ) -> Result<Vec<PersonalRide>, anyhow::Error>;

    async fn get(&self, id: &str) -> Result<Option<PersonalRide>, anyhow::Error>;

    async fn insert(
        &self,
        driver_id: &str,
        ride: &NewPersonalRide,
    ) -> Result<PersonalRide, anyhow::Error>;

    async fn update(&self, ride: &PersonalRide) -> Result<PersonalRide, anyhow::Error>;

    async fn delete(&self, id: &str, driver_id: &str) -> Result<bool, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgPersonalRideRepository {
    conn: PgPool,
}

impl PgPersonalRideRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl PersonalRideRepository for PgPersonalRideRepository {
    async fn list(
        &self,
        driver_id: &str,
        filter: &PersonalRideQuery,
    ) -> Result<Vec<PersonalRide>, anyhow::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM personal_rides WHERE driver_id = ");
        query.push_bind(driver_id);

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        query.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let rides = query
            .build_query_as::<PersonalRide>()
            .fetch_all(&self.conn)
            .await?;

        Ok(rides)
    }

    async fn get(&self, id: &str) -> Result<Option<PersonalRide>, anyhow::Error> {
        let ride = sqlx::query_as::<_, PersonalRide>("SELECT * FROM personal_rides WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(ride)
    }

    async fn insert(
        &self,
        driver_id: &str,
        ride: &NewPersonalRide,
    ) -> Result<PersonalRide, anyhow::Error> {
        let stored = sqlx::query_as::<_, PersonalRide>(
            r#"INSERT INTO personal_rides
            (id, driver_id, source, pickup_address, dropoff_address, scheduled_at,
             price_cents, distance_km, duration_minutes, client_name, client_phone,
             notes, status, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    CASE WHEN $13 = 'COMPLETED' THEN CURRENT_TIMESTAMP END)
            RETURNING *"#,
        )
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(driver_id)
        .bind(ride.source)
        .bind(&ride.pickup_address)
        .bind(&ride.dropoff_address)
        .bind(ride.scheduled_at)
        .bind(ride.price_cents)
        .bind(ride.distance_km)
        .bind(ride.duration_minutes)
        .bind(&ride.client_name)
        .bind(&ride.client_phone)
        .bind(&ride.notes)
        .bind(ride.status)
        .fetch_one(&self.conn)
        .await?;

        Ok(stored)
    }

    async fn update(&self, ride: &PersonalRide) -> Result<PersonalRide, anyhow::Error> {
        let stored = sqlx::query_as::<_, PersonalRide>(
            r#"UPDATE personal_rides
            SET source = $1,
                pickup_address = $2,
                dropoff_address = $3,
                scheduled_at = $4,
                price_cents = $5,
                distance_km = $6,
                duration_minutes = $7,
                client_name = $8,
                client_phone = $9,
                notes = $10,
                status = $11,
                completed_at = $12,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $13 AND driver_id = $14
            RETURNING *"#,
        )
        .bind(ride.source)
        .bind(&ride.pickup_address)
        .bind(&ride.dropoff_address)
        .bind(ride.scheduled_at)
        .bind(ride.price_cents)
        .bind(ride.distance_km)
        .bind(ride.duration_minutes)
        .bind(&ride.client_name)
        .bind(&ride.client_phone)
        .bind(&ride.notes)
        .bind(ride.status)
        .bind(ride.completed_at)
        .bind(&ride.id)
        .bind(&ride.driver_id)
        .fetch_one(&self.conn)
        .await?;

        Ok(stored)
    }

    async fn delete(&self, id: &str, driver_id: &str) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM personal_rides WHERE id = $1 AND driver_id = $2")
            .bind(id)
            .bind(driver_id)
            .execute(&self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
