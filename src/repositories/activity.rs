use crate::models::activity::{ActionType, ActivityEntry};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn record(
        &self,
        user_id: &str,
        action_type: ActionType,
        description: &str,
        ride_id: Option<&str>,
    ) -> Result<(), anyhow::Error>;

    async fn recent(&self, user_id: &str, limit: i64) -> Result<Vec<ActivityEntry>, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgActivityRepository {
    conn: PgPool,
}

impl PgActivityRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn record(
        &self,
        user_id: &str,
        action_type: ActionType,
        description: &str,
        ride_id: Option<&str>,
    ) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"INSERT INTO activity_log (id, user_id, action_type, description, ride_id)
            VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(user_id)
        .bind(action_type)
        .bind(description)
        .bind(ride_id)
        .execute(&self.conn)
        .await?;

        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: i64) -> Result<Vec<ActivityEntry>, anyhow::Error> {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            r#"SELECT * FROM activity_log
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.conn)
        .await?;

        Ok(entries)
    }
}
