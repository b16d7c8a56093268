mod model;
mod state;
mod workflow;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{privacy::Action, session::CurrentUser, AppResult, AppState};

pub use model::AccessRequest;
pub use state::AccessRequestStatus;
pub use workflow::{handle_access_request, list_access_requests, request_access};

/// Routes merged into `/privacy`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/memorials/{memorial_id}/request-access", post(create))
        .route("/memorials/{memorial_id}/access-requests", get(list))
        .route("/access-requests/{request_id}/handle", post(handle))
}

#[derive(Deserialize)]
struct RequestBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct HandleBody {
    approve: bool,
    #[serde(default)]
    granted_scopes: Vec<Action>,
}

#[debug_handler]
async fn create(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(memorial_id): Path<Uuid>,
    Json(RequestBody { message }): Json<RequestBody>,
) -> AppResult<(StatusCode, Json<AccessRequest>)> {
    let request = request_access(&db_pool, &user_id, memorial_id, message).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[debug_handler]
async fn list(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(memorial_id): Path<Uuid>,
) -> AppResult<Json<Vec<AccessRequest>>> {
    Ok(Json(list_access_requests(&db_pool, &user_id, memorial_id).await?))
}

#[debug_handler]
async fn handle(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(HandleBody {
        approve,
        granted_scopes,
    }): Json<HandleBody>,
) -> AppResult<Json<AccessRequest>> {
    Ok(Json(
        handle_access_request(&db_pool, &user_id, request_id, approve, granted_scopes).await?,
    ))
}
