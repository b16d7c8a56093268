use serde::Serialize;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::state::AccessRequestStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AccessRequest {
    pub id: Uuid,
    pub memorial_id: Uuid,
    pub requester_id: String,
    pub message: String,
    pub status: AccessRequestStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AccessRequest {
    pub(crate) async fn find(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, memorial_id, requester_id, message, status, created_at, updated_at
             FROM access_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub(crate) async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO access_requests
                (id, memorial_id, requester_id, message, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.memorial_id)
        .bind(&self.requester_id)
        .bind(&self.message)
        .bind(self.status)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub(crate) async fn pending_exists(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
        requester_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM access_requests
             WHERE memorial_id = ? AND requester_id = ? AND status = 'pending'",
        )
        .bind(memorial_id)
        .bind(requester_id)
        .fetch_optional(conn)
        .await?;
        Ok(row.is_some())
    }

    pub(crate) async fn approved_exists(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
        requester_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM access_requests
             WHERE memorial_id = ? AND requester_id = ? AND status = 'approved'
             LIMIT 1",
        )
        .bind(memorial_id)
        .bind(requester_id)
        .fetch_optional(conn)
        .await?;
        Ok(row.is_some())
    }

    pub(crate) async fn for_memorial(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, memorial_id, requester_id, message, status, created_at, updated_at
             FROM access_requests WHERE memorial_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(memorial_id)
        .fetch_all(conn)
        .await
    }

    pub(crate) async fn pending_for_memorial(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, memorial_id, requester_id, message, status, created_at, updated_at
             FROM access_requests WHERE memorial_id = ? AND status = 'pending'
             ORDER BY created_at ASC, id ASC",
        )
        .bind(memorial_id)
        .fetch_all(conn)
        .await
    }

    /// Resolves a request that is still pending. False when someone else got there first.
    pub(crate) async fn resolve(
        conn: &mut SqliteConnection,
        id: Uuid,
        to: AccessRequestStatus,
        now: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE access_requests SET status = ?, updated_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(to)
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
