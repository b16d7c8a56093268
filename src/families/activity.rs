//! Append-only log of what happened inside a family circle.
//!
//! Entries are written in the same transaction as the change they describe, so
//! the log never shows a change that was rolled back.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{types::Json, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{error::CoreResult, now};

use super::authority::Authority;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ActivityKind {
    Join,
    Leave,
    RemoveMember,
    SetRole,
    AddMemorial,
    RemoveMemorial,
    CreateGenealogy,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub family_id: Uuid,
    /// Who acted. For a removal this is the admin, not the removed member.
    pub user_id: String,
    pub memorial_id: Option<Uuid>,
    pub kind: ActivityKind,
    pub content: Json<Value>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    /// 1-based page and a page size clamped to `1..=100`.
    fn resolve(self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, page_size)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityPage {
    pub activities: Vec<Activity>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl Activity {
    pub(crate) async fn record(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        user_id: &str,
        memorial_id: Option<Uuid>,
        kind: ActivityKind,
        content: Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO family_activities (id, family_id, user_id, memorial_id, kind, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7())
        .bind(family_id)
        .bind(user_id)
        .bind(memorial_id)
        .bind(kind)
        .bind(Json(content))
        .bind(now())
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Newest first; ids are time-ordered so they break ties within a second.
    async fn page(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, family_id, user_id, memorial_id, kind, content, created_at
             FROM family_activities WHERE family_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(family_id)
        .bind(i64::from(limit))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(conn)
        .await
    }

    async fn count(conn: &mut SqliteConnection, family_id: Uuid) -> Result<i64, sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM family_activities WHERE family_id = ?")
            .bind(family_id)
            .fetch_one(conn)
            .await?;
        Ok(total)
    }
}

/// Content for a join; `invitation_id` is set when an accepted invitation admitted the user.
pub(crate) fn join_content(invitation_id: Option<Uuid>) -> Value {
    match invitation_id {
        Some(invitation_id) => json!({ "method": "invitation", "invitation_id": invitation_id }),
        None => json!({ "method": "invite_code" }),
    }
}

pub async fn family_activities(
    db_pool: &SqlitePool,
    user_id: &str,
    family_id: Uuid,
    query: PageQuery,
) -> CoreResult<ActivityPage> {
    let mut conn = db_pool.acquire().await?;
    Authority::require(&mut conn, family_id, user_id, Authority::Member).await?;

    let (page, page_size) = query.resolve();
    let offset = u64::from(page - 1) * u64::from(page_size);
    let total = Activity::count(&mut conn, family_id).await?;
    let activities = Activity::page(&mut conn, family_id, page_size, offset).await?;

    Ok(ActivityPage {
        activities,
        total,
        page,
        page_size,
    })
}
