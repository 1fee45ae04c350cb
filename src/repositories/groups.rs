use crate::models::groups::{Group, GroupMember, GroupSummary, NewGroup};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Creates the group together with its ACTIVE ADMIN owner row.
    async fn create_group(
        &self,
        owner_id: &str,
        owner_email: &str,
        group: &NewGroup,
    ) -> Result<Group, anyhow::Error>;

    async fn get_group(&self, id: &str) -> Result<Option<Group>, anyhow::Error>;

    async fn groups_for_user(&self, user_id: &str) -> Result<Vec<GroupSummary>, anyhow::Error>;

    async fn members(&self, group_id: &str) -> Result<Vec<GroupMember>, anyhow::Error>;

    async fn membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupMember>, anyhow::Error>;

    async fn membership_by_email(
        &self,
        group_id: &str,
        email: &str,
    ) -> Result<Option<GroupMember>, anyhow::Error>;

    /// Inserts a PENDING invitation, or revives a REJECTED/LEFT row. `None`
    /// when an ACTIVE or PENDING row already holds the email.
    async fn upsert_invitation(
        &self,
        group_id: &str,
        email: &str,
        user_id: Option<&str>,
        invited_by: &str,
    ) -> Result<Option<GroupMember>, anyhow::Error>;

    /// Attaches email-only invitations to a newly known user.
    async fn link_invitations(&self, email: &str, user_id: &str) -> Result<u64, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgGroupRepository {
    conn: PgPool,
}

impl PgGroupRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn create_group(
        &self,
        owner_id: &str,
        owner_email: &str,
        group: &NewGroup,
    ) -> Result<Group, anyhow::Error> {
        let group_id = Uuid::new_v4().hyphenated().to_string();
        let mut tx = self.conn.begin().await?;

        let stored = sqlx::query_as::<_, Group>(
            r#"INSERT INTO driver_groups (id, owner_id, name, description, icon)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *"#,
        )
        .bind(&group_id)
        .bind(owner_id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.icon)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO group_members (id, group_id, user_id, email, role, status)
            VALUES ($1, $2, $3, $4, 'ADMIN', 'ACTIVE')"#,
        )
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(&group_id)
        .bind(owner_id)
        .bind(owner_email)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(stored)
    }

    async fn get_group(&self, id: &str) -> Result<Option<Group>, anyhow::Error> {
        let group = sqlx::query_as::<_, Group>("SELECT * FROM driver_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(group)
    }

    async fn groups_for_user(&self, user_id: &str) -> Result<Vec<GroupSummary>, anyhow::Error> {
        let groups = sqlx::query_as::<_, GroupSummary>(
            r#"SELECT g.*,
                (SELECT COUNT(*) FROM group_members c
                 WHERE c.group_id = g.id AND c.status = 'ACTIVE') AS member_count,
                m.role
            FROM driver_groups g
            JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = $1 AND m.status = 'ACTIVE'
            ORDER BY g.created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(groups)
    }

    async fn members(&self, group_id: &str) -> Result<Vec<GroupMember>, anyhow::Error> {
        let members = sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM group_members WHERE group_id = $1 ORDER BY created_at ASC",
        )
        .bind(group_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(members)
    }

    async fn membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupMember>, anyhow::Error> {
        let member = sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM group_members WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(member)
    }

    async fn membership_by_email(
        &self,
        group_id: &str,
        email: &str,
    ) -> Result<Option<GroupMember>, anyhow::Error> {
        let member = sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM group_members WHERE group_id = $1 AND email = $2",
        )
        .bind(group_id)
        .bind(email)
        .fetch_optional(&self.conn)
        .await?;

        Ok(member)
    }

    async fn upsert_invitation(
        &self,
        group_id: &str,
        email: &str,
        user_id: Option<&str>,
        invited_by: &str,
    ) -> Result<Option<GroupMember>, anyhow::Error> {
        let member = sqlx::query_as::<_, GroupMember>(
            r#"INSERT INTO group_members (id, group_id, user_id, email, role, status, invited_by)
            VALUES ($1, $2, $3, $4, 'MEMBER', 'PENDING', $5)
            ON CONFLICT (group_id, email) DO UPDATE
            SET status = 'PENDING',
                role = 'MEMBER',
                user_id = COALESCE(EXCLUDED.user_id, group_members.user_id),
                invited_by = EXCLUDED.invited_by,
                updated_at = CURRENT_TIMESTAMP
            WHERE group_members.status IN ('REJECTED', 'LEFT')
            RETURNING *"#,
        )
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(group_id)
        .bind(user_id)
        .bind(email)
        .bind(invited_by)
        .fetch_optional(&self.conn)
        .await?;

        Ok(member)
    }

    async fn link_invitations(&self, email: &str, user_id: &str) -> Result<u64, anyhow::Error> {
        let result = sqlx::query(
            r#"UPDATE group_members
            SET user_id = $1, updated_at = CURRENT_TIMESTAMP
            WHERE email = $2 AND user_id IS NULL"#,
        )
        .bind(user_id)
        .bind(email)
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected())
    }
}
