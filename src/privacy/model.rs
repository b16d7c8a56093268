use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::CoreError;

/// Something a visitor can do on a memorial page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Action {
    View,
    Worship,
    Comment,
    Share,
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Action::View),
            "worship" => Ok(Action::Worship),
            "comment" => Ok(Action::Comment),
            "share" => Ok(Action::Share),
            other => Err(CoreError::validation(format!("unknown action {other:?}"))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Action::View => "view",
            Action::Worship => "worship",
            Action::Comment => "comment",
            Action::Share => "share",
        })
    }
}

/// Explicit allow for one action on one memorial, granted to a user or to a whole family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PrivacyOverride {
    pub id: Uuid,
    pub memorial_id: Uuid,
    pub user_id: Option<String>,
    pub family_id: Option<Uuid>,
    pub action: Action,
    pub allowed: bool,
    pub created_at: i64,
}

impl PrivacyOverride {
    pub(crate) fn for_user(memorial_id: Uuid, user_id: &str, action: Action, created_at: i64) -> Self {
        Self {
            id: Uuid::now_v7(),
            memorial_id,
            user_id: Some(user_id.to_owned()),
            family_id: None,
            action,
            allowed: true,
            created_at,
        }
    }

    pub(crate) fn for_family(memorial_id: Uuid, family_id: Uuid, action: Action, created_at: i64) -> Self {
        Self {
            id: Uuid::now_v7(),
            memorial_id,
            user_id: None,
            family_id: Some(family_id),
            action,
            allowed: true,
            created_at,
        }
    }

    pub(crate) async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO privacy_overrides (id, memorial_id, user_id, family_id, action, allowed, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.memorial_id)
        .bind(&self.user_id)
        .bind(self.family_id)
        .bind(self.action)
        .bind(self.allowed)
        .bind(self.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub(crate) async fn for_memorial(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, memorial_id, user_id, family_id, action, allowed, created_at
             FROM privacy_overrides WHERE memorial_id = ? ORDER BY created_at ASC",
        )
        .bind(memorial_id)
        .fetch_all(conn)
        .await
    }

    /// Whether an allow override covers `user_id` directly or through one of their families.
    pub(crate) async fn grants(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
        user_id: &str,
        action: Action,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM privacy_overrides o
             WHERE o.memorial_id = ? AND o.action = ? AND o.allowed = 1
               AND (o.user_id = ?
                    OR o.family_id IN (
                        SELECT m.family_id FROM memberships m
                        JOIN families f ON f.id = m.family_id
                        WHERE m.user_id = ? AND f.deleted_at IS NULL))
             LIMIT 1",
        )
        .bind(memorial_id)
        .bind(action)
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
        Ok(row.is_some())
    }

    pub(crate) async fn delete_for_memorial(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM privacy_overrides WHERE memorial_id = ?")
            .bind(memorial_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub(crate) async fn delete_for_user(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
        user_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM privacy_overrides WHERE memorial_id = ? AND user_id = ?")
            .bind(memorial_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BlacklistEntry {
    pub memorial_id: Uuid,
    pub user_id: String,
    pub reason: String,
    pub created_at: i64,
}

impl BlacklistEntry {
    pub(crate) async fn contains(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
        user_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM blacklist WHERE memorial_id = ? AND user_id = ?")
                .bind(memorial_id)
                .bind(user_id)
                .fetch_optional(conn)
                .await?;
        Ok(row.is_some())
    }

    pub(crate) async fn for_memorial(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT memorial_id, user_id, reason, created_at FROM blacklist
             WHERE memorial_id = ? ORDER BY created_at ASC",
        )
        .bind(memorial_id)
        .fetch_all(conn)
        .await
    }

    pub(crate) async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO blacklist (memorial_id, user_id, reason, created_at) VALUES (?, ?, ?, ?)")
            .bind(self.memorial_id)
            .bind(&self.user_id)
            .bind(&self.reason)
            .bind(self.created_at)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub(crate) async fn delete(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
        user_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM blacklist WHERE memorial_id = ? AND user_id = ?")
            .bind(memorial_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub(crate) async fn delete_for_memorial(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM blacklist WHERE memorial_id = ?")
            .bind(memorial_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
