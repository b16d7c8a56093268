use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::CoreError;

/// A family circle. `creator_id` holds permanent top authority over the circle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub creator_id: String,
    pub invite_code: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Stored membership role. The creator's authority is never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::validation(format!("unknown role {other:?}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Role::Member => "member",
            Role::Admin => "admin",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Membership {
    pub family_id: Uuid,
    pub user_id: String,
    pub role: Role,
    pub joined_at: i64,
}

impl Family {
    /// Looks up a live (not soft-deleted) family.
    pub(crate) async fn find(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, name, description, creator_id, invite_code, created_at, updated_at
             FROM families WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub(crate) async fn find_by_code(
        conn: &mut SqliteConnection,
        invite_code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, name, description, creator_id, invite_code, created_at, updated_at
             FROM families WHERE invite_code = ? AND deleted_at IS NULL",
        )
        .bind(invite_code)
        .fetch_optional(conn)
        .await
    }

    pub(crate) async fn for_user(
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT f.id, f.name, f.description, f.creator_id, f.invite_code, f.created_at, f.updated_at
             FROM families f
             JOIN memberships m ON m.family_id = f.id
             WHERE m.user_id = ? AND f.deleted_at IS NULL
             ORDER BY f.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await
    }

    pub(crate) async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO families (id, name, description, creator_id, invite_code, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.description)
        .bind(&self.creator_id)
        .bind(&self.invite_code)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub(crate) async fn update_details(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE families SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.updated_at)
            .bind(self.id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub(crate) async fn soft_delete(
        conn: &mut SqliteConnection,
        id: Uuid,
        at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE families SET deleted_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

impl Membership {
    pub(crate) async fn find(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT family_id, user_id, role, joined_at FROM memberships
             WHERE family_id = ? AND user_id = ?",
        )
        .bind(family_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }

    /// Admins first, then by join time.
    pub(crate) async fn list(
        conn: &mut SqliteConnection,
        family_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT family_id, user_id, role, joined_at FROM memberships
             WHERE family_id = ?
             ORDER BY CASE role WHEN 'admin' THEN 0 ELSE 1 END, joined_at ASC",
        )
        .bind(family_id)
        .fetch_all(conn)
        .await
    }

    /// Plain insert; a second row for the same (family, user) fails on the primary key.
    pub(crate) async fn insert(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        user_id: &str,
        role: Role,
        joined_at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO memberships (family_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
            .bind(family_id)
            .bind(user_id)
            .bind(role)
            .bind(joined_at)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Idempotent insert. Returns false when the membership already existed.
    pub(crate) async fn insert_if_absent(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        user_id: &str,
        joined_at: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO memberships (family_id, user_id, role, joined_at) VALUES (?, ?, 'member', ?)
             ON CONFLICT (family_id, user_id) DO NOTHING",
        )
        .bind(family_id)
        .bind(user_id)
        .bind(joined_at)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub(crate) async fn set_role(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        user_id: &str,
        role: Role,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE memberships SET role = ? WHERE family_id = ? AND user_id = ?")
            .bind(role)
            .bind(family_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub(crate) async fn delete(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        user_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM memberships WHERE family_id = ? AND user_id = ?")
            .bind(family_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub(crate) async fn delete_all(
        conn: &mut SqliteConnection,
        family_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM memberships WHERE family_id = ?")
            .bind(family_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
