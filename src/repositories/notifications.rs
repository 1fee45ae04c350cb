use crate::models::notifications::NotificationPreferences;

use async_trait::async_trait;
use sqlx::PgPool;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn get_preferences(
        &self,
        user_id: &str,
    ) -> Result<Option<NotificationPreferences>, anyhow::Error>;

    async fn save_preferences(
        &self,
        user_id: &str,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    conn: PgPool,
}

impl PgNotificationRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn get_preferences(
        &self,
        user_id: &str,
    ) -> Result<Option<NotificationPreferences>, anyhow::Error> {
        let prefs = sqlx::query_as::<_, NotificationPreferences>(
            r#"SELECT enabled, ride_reminders, daily_summary, new_rides_available,
                low_credits, badges_earned, group_invitations, ride_completed
            FROM notification_preferences WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(prefs)
    }

    async fn save_preferences(
        &self,
        user_id: &str,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences, anyhow::Error> {
        let stored = sqlx::query_as::<_, NotificationPreferences>(
            r#"INSERT INTO notification_preferences
            (user_id, enabled, ride_reminders, daily_summary, new_rides_available,
             low_credits, badges_earned, group_invitations, ride_completed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE
            SET enabled = EXCLUDED.enabled,
                ride_reminders = EXCLUDED.ride_reminders,
                daily_summary = EXCLUDED.daily_summary,
                new_rides_available = EXCLUDED.new_rides_available,
                low_credits = EXCLUDED.low_credits,
                badges_earned = EXCLUDED.badges_earned,
                group_invitations = EXCLUDED.group_invitations,
                ride_completed = EXCLUDED.ride_completed,
                updated_at = CURRENT_TIMESTAMP
            RETURNING enabled, ride_reminders, daily_summary, new_rides_available,
                low_credits, badges_earned, group_invitations, ride_completed"#,
        )
        .bind(user_id)
        .bind(prefs.enabled)
        .bind(prefs.ride_reminders)
        .bind(prefs.daily_summary)
        .bind(prefs.new_rides_available)
        .bind(prefs.low_credits)
        .bind(prefs.badges_earned)
        .bind(prefs.group_invitations)
        .bind(prefs.ride_completed)
        .fetch_one(&self.conn)
        .await?;

        Ok(stored)
    }
}
