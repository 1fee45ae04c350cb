use crate::models::rides::{ClaimOutcome, MyRidesKind, NewRide, Ride, RideFilter, RideStatus};
use crate::models::users::CreditKind;
use crate::repositories::users::{apply_credit, record_credit_transaction};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[async_trait]
pub trait RideRepository: Send + Sync {
    /// Stores a PUBLISHED ride and, in the same unit of work, credits the
    /// creator with `publish_credit` when it is positive.
    async fn insert_ride(
        &self,
        creator_id: &str,
        ride: &NewRide,
        publish_credit: i64,
    ) -> Result<Ride, anyhow::Error>;

    async fn get_ride(&self, id: &str) -> Result<Option<Ride>, anyhow::Error>;

    async fn list_rides(
        &self,
        viewer_id: &str,
        filter: &RideFilter,
        limit: i64,
    ) -> Result<Vec<Ride>, anyhow::Error>;

    async fn my_rides(&self, user_id: &str, kind: MyRidesKind) -> Result<Vec<Ride>, anyhow::Error>;

    /// PUBLISHED rides scheduled before `now` become EXPIRED.
    async fn expire_past_rides(&self, now: DateTime<Utc>) -> Result<u64, anyhow::Error>;

    /// Deducts `cost` from the picker and moves the ride to CLAIMED, both or
    /// neither. Conditional on the ride still being PUBLISHED, not owned by
    /// the picker, and the picker holding at least `cost` credits.
    async fn claim_ride(
        &self,
        ride_id: &str,
        picker_id: &str,
        cost: i64,
    ) -> Result<ClaimOutcome, anyhow::Error>;

    /// Moves a CLAIMED ride held by `picker_id` to COMPLETED and pays the
    /// creator `bonus`. `None` when the conditional update matched nothing.
    async fn complete_ride(
        &self,
        ride_id: &str,
        picker_id: &str,
        bonus: i64,
    ) -> Result<Option<Ride>, anyhow::Error>;

    async fn delete_ride(&self, ride_id: &str, creator_id: &str) -> Result<bool, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgRideRepository {
    conn: PgPool,
}

impl PgRideRepository {
    pub fn new(conn: PgPool) -> Self {
        PgRideRepository { conn }
    }
}

#[async_trait]
impl RideRepository for PgRideRepository {
    async fn insert_ride(
        &self,
        creator_id: &str,
        ride: &NewRide,
        publish_credit: i64,
    ) -> Result<Ride, anyhow::Error> {
        let ride_id = Uuid::new_v4().hyphenated().to_string();
        let mut tx = self.conn.begin().await?;

        let stored = sqlx::query_as::<_, Ride>(
            r#"INSERT INTO rides
            (id, creator_id, pickup_address, dropoff_address, scheduled_at, price_cents,
             status, visibility, vehicle_type, distance_km, duration_minutes,
             commission_enabled, group_id)
            VALUES ($1, $2, $3, $4, $5, $6, 'PUBLISHED', $7, $8, $9, $10, $11, $12)
            RETURNING *"#,
        )
        .bind(&ride_id)
        .bind(creator_id)
        .bind(&ride.pickup_address)
        .bind(&ride.dropoff_address)
        .bind(ride.scheduled_at)
        .bind(ride.price_cents)
        .bind(ride.visibility)
        .bind(&ride.vehicle_type)
        .bind(ride.distance_km)
        .bind(ride.duration_minutes)
        .bind(ride.commission_enabled)
        .bind(&ride.group_id)
        .fetch_one(&mut *tx)
        .await?;

        if publish_credit > 0 {
            apply_credit(
                &mut tx,
                creator_id,
                publish_credit,
                CreditKind::PublishRide,
                Some(&ride_id),
            )
            .await?;
        }

        tx.commit().await?;

        Ok(stored)
    }

    async fn get_ride(&self, id: &str) -> Result<Option<Ride>, anyhow::Error> {
        let ride = sqlx::query_as::<_, Ride>("SELECT * FROM rides WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(ride)
    }

    async fn list_rides(
        &self,
        viewer_id: &str,
        filter: &RideFilter,
        limit: i64,
    ) -> Result<Vec<Ride>, anyhow::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM rides WHERE ");

        query
            .push("(visibility <> 'PERSONAL' OR creator_id = ")
            .push_bind(viewer_id)
            .push(")");

        match filter.status {
            Some(status) => {
                query.push(" AND status = ").push_bind(status);
            }
            None => {
                query.push(" AND status <> 'EXPIRED'");
            }
        }

        if let Some(visibility) = filter.visibility {
            query.push(" AND visibility = ").push_bind(visibility);
        }

        if let Some(group_id) = &filter.group_id {
            query.push(" AND group_id = ").push_bind(group_id);
        }

        query
            .push(" ORDER BY scheduled_at ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let rides = query
            .build_query_as::<Ride>()
            .fetch_all(&self.conn)
            .await?;

        Ok(rides)
    }

    async fn my_rides(&self, user_id: &str, kind: MyRidesKind) -> Result<Vec<Ride>, anyhow::Error> {
        let sql = match kind {
            MyRidesKind::Claimed => {
                "SELECT * FROM rides WHERE picker_id = $1 ORDER BY scheduled_at DESC"
            }
            MyRidesKind::Published => {
                "SELECT * FROM rides WHERE creator_id = $1 ORDER BY scheduled_at DESC"
            }
        };

        let rides = sqlx::query_as::<_, Ride>(sql)
            .bind(user_id)
            .fetch_all(&self.conn)
            .await?;

        Ok(rides)
    }

    async fn expire_past_rides(&self, now: DateTime<Utc>) -> Result<u64, anyhow::Error> {
        let result = sqlx::query(
            r#"UPDATE rides
            SET status = 'EXPIRED', updated_at = CURRENT_TIMESTAMP
            WHERE status = 'PUBLISHED' AND scheduled_at < $1"#,
        )
        .bind(now)
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn claim_ride(
        &self,
        ride_id: &str,
        picker_id: &str,
        cost: i64,
    ) -> Result<ClaimOutcome, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let credits: Option<i64> = sqlx::query_scalar(
            r#"UPDATE users
            SET credits = COALESCE(credits, 0) - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND COALESCE(credits, 0) >= $1
            RETURNING credits"#,
        )
        .bind(cost)
        .bind(picker_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(credits) = credits else {
            tx.rollback().await?;
            return Ok(ClaimOutcome::InsufficientCredits);
        };

        let ride = sqlx::query_as::<_, Ride>(
            r#"UPDATE rides
            SET picker_id = $1, status = 'CLAIMED', updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3 AND creator_id <> $1
            RETURNING *"#,
        )
        .bind(picker_id)
        .bind(ride_id)
        .bind(RideStatus::Published)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(ride) = ride else {
            tx.rollback().await?;
            return Ok(ClaimOutcome::RideUnavailable);
        };

        record_credit_transaction(&mut tx, picker_id, -cost, CreditKind::ClaimRide, Some(ride_id))
            .await?;
        tx.commit().await?;

        Ok(ClaimOutcome::Claimed { ride, credits })
    }

    async fn complete_ride(
        &self,
        ride_id: &str,
        picker_id: &str,
        bonus: i64,
    ) -> Result<Option<Ride>, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let ride = sqlx::query_as::<_, Ride>(
            r#"UPDATE rides
            SET status = 'COMPLETED',
                completed_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'CLAIMED' AND picker_id = $2
            RETURNING *"#,
        )
        .bind(ride_id)
        .bind(picker_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(ride) = ride else {
            tx.rollback().await?;
            return Ok(None);
        };

        if bonus > 0 {
            apply_credit(
                &mut tx,
                &ride.creator_id,
                bonus,
                CreditKind::CompleteRideBonus,
                Some(ride_id),
            )
            .await?;
        }

        tx.commit().await?;

        Ok(Some(ride))
    }

    async fn delete_ride(&self, ride_id: &str, creator_id: &str) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM rides WHERE id = $1 AND creator_id = $2")
            .bind(ride_id)
            .bind(creator_id)
            .execute(&self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
