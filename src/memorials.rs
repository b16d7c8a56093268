//! Memorial references and memorial↔family links.
//!
//! Memorial pages themselves belong to the memorial service; this module only reads
//! the owner and privacy level the gate needs and maintains which families a memorial
//! is shared with.

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::{
    begin_write,
    error::{is_unique_violation, CoreError, CoreResult},
    families::{Activity, ActivityKind, Authority},
    now,
    session::CurrentUser,
    AppResult, AppState,
};

/// Default visibility tier of a memorial. Lower values are more permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum PrivacyLevel {
    Public = 0,
    Family = 1,
    Private = 2,
}

impl PrivacyLevel {
    pub fn is_most_permissive(self) -> bool {
        self == PrivacyLevel::Public
    }
}

/// What the memorial service tells the core about one memorial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MemorialRef {
    pub id: Uuid,
    pub creator_id: String,
    pub privacy_level: PrivacyLevel,
}

impl MemorialRef {
    pub(crate) async fn find(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT id, creator_id, privacy_level FROM memorials WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Owner and privacy level, failing `NotFound` when the memorial does not exist.
    pub(crate) async fn owner_and_privacy(conn: &mut SqliteConnection, id: Uuid) -> CoreResult<Self> {
        Self::find(conn, id).await?.ok_or(CoreError::NotFound("memorial"))
    }

    /// Loads the memorial and checks the caller created it.
    pub(crate) async fn require_owner(
        conn: &mut SqliteConnection,
        id: Uuid,
        user_id: &str,
    ) -> CoreResult<Self> {
        let memorial = Self::owner_and_privacy(conn, id).await?;
        if memorial.creator_id != user_id {
            return Err(CoreError::forbidden("only the memorial creator may do this"));
        }
        Ok(memorial)
    }

    pub(crate) async fn set_privacy_level(
        conn: &mut SqliteConnection,
        id: Uuid,
        level: PrivacyLevel,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE memorials SET privacy_level = ? WHERE id = ?")
            .bind(level)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

/// Row in the many-to-many memorial↔family association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MemorialLink {
    pub memorial_id: Uuid,
    pub family_id: Uuid,
    pub created_at: i64,
}

impl MemorialLink {
    pub(crate) async fn exists(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
        family_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM memorial_families WHERE memorial_id = ? AND family_id = ?")
                .bind(memorial_id)
                .bind(family_id)
                .fetch_optional(conn)
                .await?;
        Ok(row.is_some())
    }

    /// Whether `user_id` belongs to at least one live family linked to the memorial.
    pub(crate) async fn shared_with_member(
        conn: &mut SqliteConnection,
        memorial_id: Uuid,
        user_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM memorial_families mf
             JOIN memberships m ON m.family_id = mf.family_id
             JOIN families f ON f.id = mf.family_id
             WHERE mf.memorial_id = ? AND m.user_id = ? AND f.deleted_at IS NULL
             LIMIT 1",
        )
        .bind(memorial_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
        Ok(row.is_some())
    }

    pub(crate) async fn for_family(
        conn: &mut SqliteConnection,
        family_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT memorial_id, family_id, created_at FROM memorial_families
             WHERE family_id = ? ORDER BY created_at ASC",
        )
        .bind(family_id)
        .fetch_all(conn)
        .await
    }

    pub(crate) async fn delete_for_family(
        conn: &mut SqliteConnection,
        family_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM memorial_families WHERE family_id = ?")
            .bind(family_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Shares a memorial with a family. The caller needs admin authority in the family
/// and must have created the memorial.
pub async fn link_memorial(
    db_pool: &SqlitePool,
    acting_user_id: &str,
    family_id: Uuid,
    memorial_id: Uuid,
) -> CoreResult<MemorialLink> {
    let mut tx = begin_write(db_pool).await?;
    Authority::require(&mut tx, family_id, acting_user_id, Authority::Admin).await?;
    MemorialRef::require_owner(&mut tx, memorial_id, acting_user_id).await?;

    let link = MemorialLink {
        memorial_id,
        family_id,
        created_at: now(),
    };
    let inserted = sqlx::query(
        "INSERT INTO memorial_families (memorial_id, family_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(link.memorial_id)
    .bind(link.family_id)
    .bind(link.created_at)
    .execute(&mut *tx)
    .await;
    match inserted {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            return Err(CoreError::conflict("memorial is already linked to this family"));
        }
        Err(err) => return Err(err.into()),
    }
    Activity::record(
        &mut tx,
        family_id,
        acting_user_id,
        Some(memorial_id),
        ActivityKind::AddMemorial,
        json!({}),
    )
    .await?;
    tx.commit().await?;

    info!(%family_id, %memorial_id, "memorial linked");
    Ok(link)
}

pub async fn unlink_memorial(
    db_pool: &SqlitePool,
    acting_user_id: &str,
    family_id: Uuid,
    memorial_id: Uuid,
) -> CoreResult<()> {
    let mut tx = begin_write(db_pool).await?;
    Authority::require(&mut tx, family_id, acting_user_id, Authority::Admin).await?;

    let result = sqlx::query("DELETE FROM memorial_families WHERE memorial_id = ? AND family_id = ?")
        .bind(memorial_id)
        .bind(family_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CoreError::NotFound("memorial link"));
    }
    Activity::record(
        &mut tx,
        family_id,
        acting_user_id,
        Some(memorial_id),
        ActivityKind::RemoveMemorial,
        json!({}),
    )
    .await?;
    tx.commit().await?;

    info!(%family_id, %memorial_id, "memorial unlinked");
    Ok(())
}

pub async fn family_memorials(
    db_pool: &SqlitePool,
    user_id: &str,
    family_id: Uuid,
) -> CoreResult<Vec<MemorialLink>> {
    let mut conn = db_pool.acquire().await?;
    Authority::require(&mut conn, family_id, user_id, Authority::Member).await?;
    Ok(MemorialLink::for_family(&mut conn, family_id).await?)
}

#[derive(Deserialize)]
struct LinkBody {
    memorial_id: Uuid,
}

#[debug_handler]
async fn list_links(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
) -> AppResult<Json<Vec<MemorialLink>>> {
    Ok(Json(family_memorials(&db_pool, &user_id, family_id).await?))
}

#[debug_handler]
async fn create_link(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
    Json(LinkBody { memorial_id }): Json<LinkBody>,
) -> AppResult<(StatusCode, Json<MemorialLink>)> {
    let link = link_memorial(&db_pool, &user_id, family_id, memorial_id).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

#[debug_handler]
async fn delete_link(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path((family_id, memorial_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    unlink_memorial(&db_pool, &user_id, family_id, memorial_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{family_id}/memorials", get(list_links).post(create_link))
        .route("/{family_id}/memorials/{memorial_id}", delete(delete_link))
}
