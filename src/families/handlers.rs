use axum::{debug_handler, extract::{Path, Query, State}, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{session::CurrentUser, AppResult};

use super::{
    activity::{self, ActivityPage, PageQuery},
    model::Family,
    registry::{self, CreateFamily, MemberView, UpdateFamily},
};

#[derive(Deserialize)]
pub(crate) struct JoinByCodeBody {
    invite_code: String,
}

#[derive(Deserialize)]
pub(crate) struct SetRoleBody {
    role: String,
}

#[debug_handler]
pub(crate) async fn list_families(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<Vec<Family>>> {
    Ok(Json(registry::list_families(&db_pool, &user_id).await?))
}

#[debug_handler]
pub(crate) async fn create_family(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<CreateFamily>,
) -> AppResult<(StatusCode, Json<Family>)> {
    let family = registry::create_family(&db_pool, &user_id, body).await?;
    Ok((StatusCode::CREATED, Json(family)))
}

#[debug_handler]
pub(crate) async fn get_family(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
) -> AppResult<Json<Family>> {
    Ok(Json(registry::get_family(&db_pool, &user_id, family_id).await?))
}

#[debug_handler]
pub(crate) async fn update_family(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
    Json(body): Json<UpdateFamily>,
) -> AppResult<Json<Family>> {
    Ok(Json(registry::update_family(&db_pool, &user_id, family_id, body).await?))
}

#[debug_handler]
pub(crate) async fn delete_family(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    registry::delete_family(&db_pool, &user_id, family_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
pub(crate) async fn join_by_code(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Json(JoinByCodeBody { invite_code }): Json<JoinByCodeBody>,
) -> AppResult<Json<Family>> {
    Ok(Json(registry::join_by_code(&db_pool, &user_id, &invite_code).await?))
}

#[debug_handler]
pub(crate) async fn list_members(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
) -> AppResult<Json<Vec<MemberView>>> {
    Ok(Json(registry::list_members(&db_pool, &user_id, family_id).await?))
}

#[debug_handler]
pub(crate) async fn remove_member(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path((family_id, member_id)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    registry::remove_member(&db_pool, &user_id, family_id, &member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
pub(crate) async fn set_member_role(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path((family_id, member_id)): Path<(Uuid, String)>,
    Json(SetRoleBody { role }): Json<SetRoleBody>,
) -> AppResult<StatusCode> {
    registry::set_member_role(&db_pool, &user_id, family_id, &member_id, &role).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
pub(crate) async fn leave_family(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    registry::leave_family(&db_pool, &user_id, family_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
pub(crate) async fn list_activities(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ActivityPage>> {
    Ok(Json(activity::family_activities(&db_pool, &user_id, family_id, query).await?))
}
