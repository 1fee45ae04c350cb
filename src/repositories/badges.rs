use crate::models::badges::{UserBadge, UserStats};

use async_trait::async_trait;
use sqlx::PgPool;

#[async_trait]
pub trait BadgeRepository: Send + Sync {
    async fn user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, anyhow::Error>;

    /// Returns true only when the award row was created by this call.
    async fn award_badge(&self, user_id: &str, badge_id: &str) -> Result<bool, anyhow::Error>;

    async fn user_stats(&self, user_id: &str) -> Result<UserStats, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgBadgeRepository {
    conn: PgPool,
}

impl PgBadgeRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl BadgeRepository for PgBadgeRepository {
    async fn user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, anyhow::Error> {
        let badges = sqlx::query_as::<_, UserBadge>(
            "SELECT user_id, badge_id, earned_at FROM user_badges WHERE user_id = $1 ORDER BY earned_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(badges)
    }

    async fn award_badge(&self, user_id: &str, badge_id: &str) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            r#"INSERT INTO user_badges (user_id, badge_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, badge_id) DO NOTHING"#,
        )
        .bind(user_id)
        .bind(badge_id)
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn user_stats(&self, user_id: &str) -> Result<UserStats, anyhow::Error> {
        let (published, completed_as_picker, credits): (i64, i64, i64) = sqlx::query_as(
            r#"SELECT
                (SELECT COUNT(*) FROM rides WHERE creator_id = $1),
                (SELECT COUNT(*) FROM rides WHERE picker_id = $1 AND status = 'COMPLETED'),
                COALESCE((SELECT credits FROM users WHERE id = $1), 0)"#,
        )
        .bind(user_id)
        .fetch_one(&self.conn)
        .await?;

        Ok(UserStats {
            published,
            completed_as_picker,
            credits,
        })
    }
}
