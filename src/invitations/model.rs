use serde::Serialize;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::state::InvitationStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub family_id: Uuid,
    pub inviter_id: String,
    pub invitee_id: String,
    pub status: InvitationStatus,
    pub message: String,
    pub expires_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Invitation {
    pub fn effective_status(&self, now: i64) -> InvitationStatus {
        self.status.effective(self.expires_at, now)
    }

    pub(crate) async fn find(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, family_id, inviter_id, invitee_id, status, message, expires_at, created_at, updated_at
             FROM invitations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub(crate) async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO invitations
                (id, family_id, inviter_id, invitee_id, status, message, expires_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.family_id)
        .bind(&self.inviter_id)
        .bind(&self.invitee_id)
        .bind(self.status)
        .bind(&self.message)
        .bind(self.expires_at)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Whether the invitee already holds an actionable invitation to the family.
    pub(crate) async fn live_pending_exists(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        invitee_id: &str,
        now: i64,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM invitations
             WHERE family_id = ? AND invitee_id = ? AND status = 'pending' AND expires_at > ?
             LIMIT 1",
        )
        .bind(family_id)
        .bind(invitee_id)
        .bind(now)
        .fetch_optional(conn)
        .await?;
        Ok(row.is_some())
    }

    pub(crate) async fn live_pending_for_invitee(
        conn: &mut SqliteConnection,
        invitee_id: &str,
        now: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT i.id, i.family_id, i.inviter_id, i.invitee_id, i.status, i.message,
                    i.expires_at, i.created_at, i.updated_at
             FROM invitations i
             JOIN families f ON f.id = i.family_id
             WHERE i.invitee_id = ? AND i.status = 'pending' AND i.expires_at > ?
               AND f.deleted_at IS NULL
             ORDER BY i.created_at DESC",
        )
        .bind(invitee_id)
        .bind(now)
        .fetch_all(conn)
        .await
    }

    /// Moves a still-actionable pending invitation to `to`.
    ///
    /// Returns false when another request already moved it or it lapsed, so each
    /// invitation advances at most once.
    pub(crate) async fn advance(
        conn: &mut SqliteConnection,
        id: Uuid,
        to: InvitationStatus,
        now: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invitations SET status = ?, updated_at = ?
             WHERE id = ? AND status = 'pending' AND expires_at > ?",
        )
        .bind(to)
        .bind(now)
        .bind(id)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub(crate) async fn expire_pending_for_family(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        now: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'expired', updated_at = ?
             WHERE family_id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(family_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub(crate) async fn expire_overdue(conn: &mut SqliteConnection, now: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'expired', updated_at = ?
             WHERE status = 'pending' AND expires_at <= ?",
        )
        .bind(now)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
