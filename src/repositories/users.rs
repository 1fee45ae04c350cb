use crate::models::users::{
    CreditKind, CreditTransaction, User, VerificationRequest, VerificationReview,
};

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Stored credits may be NULL on legacy rows; reads and writes coalesce to 0.
const USER_COLUMNS: &str = "id, email, full_name, phone, siren, professional_card_number, \
    COALESCE(credits, 0) AS credits, verification_status, verification_submitted_at, \
    rejection_reason, is_admin, created_at, updated_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>, anyhow::Error>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error>;

    /// Inserts the user unless it already exists. The flag is true when the
    /// row was created by this call.
    async fn ensure_user(
        &self,
        id: &str,
        email: &str,
        starting_credits: i64,
    ) -> Result<(User, bool), anyhow::Error>;

    /// Adds `delta` to the balance and records it in the credit history.
    /// Returns the new balance.
    async fn adjust_credits(
        &self,
        user_id: &str,
        delta: i64,
        kind: CreditKind,
        ride_id: Option<&str>,
    ) -> Result<i64, anyhow::Error>;

    async fn credit_history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<CreditTransaction>, anyhow::Error>;

    async fn submit_verification(
        &self,
        user_id: &str,
        request: &VerificationRequest,
    ) -> Result<User, anyhow::Error>;

    async fn pending_verifications(&self) -> Result<Vec<User>, anyhow::Error>;

    async fn review_verification(
        &self,
        user_id: &str,
        review: &VerificationReview,
    ) -> Result<User, anyhow::Error>;
}

pub(crate) async fn record_credit_transaction(
    conn: &mut PgConnection,
    user_id: &str,
    amount: i64,
    kind: CreditKind,
    ride_id: Option<&str>,
) -> Result<(), anyhow::Error> {
    sqlx::query(
        r#"INSERT INTO credit_transactions (id, user_id, amount, kind, ride_id)
        VALUES ($1, $2, $3, $4, $5)"#,
    )
    .bind(Uuid::new_v4().hyphenated().to_string())
    .bind(user_id)
    .bind(amount)
    .bind(kind)
    .bind(ride_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn apply_credit(
    conn: &mut PgConnection,
    user_id: &str,
    delta: i64,
    kind: CreditKind,
    ride_id: Option<&str>,
) -> Result<i64, anyhow::Error> {
    let credits: Option<i64> = sqlx::query_scalar(
        r#"UPDATE users
        SET credits = COALESCE(credits, 0) + $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2
        RETURNING credits"#,
    )
    .bind(delta)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    let credits = credits.ok_or_else(|| anyhow!("User not found: {}", user_id))?;
    record_credit_transaction(conn, user_id, delta, kind, ride_id).await?;

    Ok(credits)
}

#[derive(Clone)]
pub struct PgUserRepository {
    conn: PgPool,
}

impl PgUserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_user(&self, id: &str) -> Result<Option<User>, anyhow::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1) LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.conn)
        .await?;

        Ok(user)
    }

    async fn ensure_user(
        &self,
        id: &str,
        email: &str,
        starting_credits: i64,
    ) -> Result<(User, bool), anyhow::Error> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users (id, email, credits, verification_status, is_admin)
            VALUES ($1, $2, $3, 'UNVERIFIED', false)
            ON CONFLICT (id) DO NOTHING
            RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .bind(email)
        .bind(starting_credits)
        .fetch_optional(&self.conn)
        .await?;

        match created {
            Some(user) => Ok((user, true)),
            None => {
                let user = self
                    .get_user(id)
                    .await?
                    .ok_or_else(|| anyhow!("User vanished after insert: {}", id))?;
                Ok((user, false))
            }
        }
    }

    async fn adjust_credits(
        &self,
        user_id: &str,
        delta: i64,
        kind: CreditKind,
        ride_id: Option<&str>,
    ) -> Result<i64, anyhow::Error> {
        let mut tx = self.conn.begin().await?;
        let credits = apply_credit(&mut tx, user_id, delta, kind, ride_id).await?;
        tx.commit().await?;

        Ok(credits)
    }

    async fn credit_history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<CreditTransaction>, anyhow::Error> {
        let history = sqlx::query_as::<_, CreditTransaction>(
            r#"SELECT * FROM credit_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.conn)
        .await?;

        Ok(history)
    }

    async fn submit_verification(
        &self,
        user_id: &str,
        request: &VerificationRequest,
    ) -> Result<User, anyhow::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"UPDATE users
            SET full_name = $1,
                phone = $2,
                siren = $3,
                professional_card_number = $4,
                email = COALESCE($5, email),
                verification_status = 'PENDING',
                verification_submitted_at = CURRENT_TIMESTAMP,
                rejection_reason = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $6
            RETURNING {USER_COLUMNS}"#
        ))
        .bind(&request.full_name)
        .bind(&request.phone)
        .bind(&request.siren)
        .bind(&request.professional_card_number)
        .bind(&request.email)
        .bind(user_id)
        .fetch_one(&self.conn)
        .await?;

        Ok(user)
    }

    async fn pending_verifications(&self) -> Result<Vec<User>, anyhow::Error> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users
            WHERE verification_status = 'PENDING'
            ORDER BY verification_submitted_at ASC"#
        ))
        .fetch_all(&self.conn)
        .await?;

        Ok(users)
    }

    async fn review_verification(
        &self,
        user_id: &str,
        review: &VerificationReview,
    ) -> Result<User, anyhow::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"UPDATE users
            SET verification_status = $1,
                rejection_reason = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING {USER_COLUMNS}"#
        ))
        .bind(review.status)
        .bind(&review.rejection_reason)
        .bind(user_id)
        .fetch_one(&self.conn)
        .await?;

        Ok(user)
    }
}
