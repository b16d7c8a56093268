mod gate;
mod model;
mod settings;

use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{session::CurrentUser, AppResult, AppState};

pub use gate::{can_access, explain, Verdict};
pub use model::{Action, BlacklistEntry, PrivacyOverride};
pub use settings::{
    add_to_blacklist, get_privacy_settings, remove_from_blacklist, set_memorial_privacy,
    MemorialPrivacy, PrivacySettings,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/memorials/{memorial_id}/access", get(check_access))
        .route("/memorials/{memorial_id}/settings", get(settings).put(update_settings))
        .route(
            "/memorials/{memorial_id}/blacklist/{user_id}",
            post(blacklist).delete(unblacklist),
        )
}

#[derive(Deserialize)]
struct CheckQuery {
    #[serde(default = "default_action")]
    action: Action,
}

fn default_action() -> Action {
    Action::View
}

#[derive(Serialize)]
struct CheckResult {
    allowed: bool,
    verdict: Verdict,
}

#[debug_handler]
async fn check_access(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(memorial_id): Path<Uuid>,
    Query(CheckQuery { action }): Query<CheckQuery>,
) -> AppResult<Json<CheckResult>> {
    let verdict = explain(&db_pool, &user_id, memorial_id, action).await?;
    Ok(Json(CheckResult {
        allowed: verdict.allowed(),
        verdict,
    }))
}

#[debug_handler]
async fn settings(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(memorial_id): Path<Uuid>,
) -> AppResult<Json<PrivacySettings>> {
    Ok(Json(get_privacy_settings(&db_pool, &user_id, memorial_id).await?))
}

#[debug_handler]
async fn update_settings(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(memorial_id): Path<Uuid>,
    Json(body): Json<MemorialPrivacy>,
) -> AppResult<Json<PrivacySettings>> {
    Ok(Json(set_memorial_privacy(&db_pool, &user_id, memorial_id, body).await?))
}

#[derive(Deserialize)]
struct BlacklistBody {
    #[serde(default)]
    reason: String,
}

#[debug_handler]
async fn blacklist(
    State(db_pool): State<SqlitePool>,
    CurrentUser(owner_id): CurrentUser,
    Path((memorial_id, user_id)): Path<(Uuid, String)>,
    Json(BlacklistBody { reason }): Json<BlacklistBody>,
) -> AppResult<(StatusCode, Json<BlacklistEntry>)> {
    let entry = add_to_blacklist(&db_pool, &owner_id, memorial_id, &user_id, reason).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[debug_handler]
async fn unblacklist(
    State(db_pool): State<SqlitePool>,
    CurrentUser(owner_id): CurrentUser,
    Path((memorial_id, user_id)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    remove_from_blacklist(&db_pool, &owner_id, memorial_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
