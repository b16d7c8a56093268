use axum::{debug_handler, extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{session::CurrentUser, AppResult, AppState, InvitationTtl};

use super::{
    model::Invitation,
    workflow::{self, InviteMembers},
};

#[derive(Deserialize)]
pub(crate) struct RespondBody {
    accept: bool,
}

#[debug_handler(state = AppState)]
pub(crate) async fn invite(
    State(db_pool): State<SqlitePool>,
    State(InvitationTtl(ttl)): State<InvitationTtl>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
    Json(body): Json<InviteMembers>,
) -> AppResult<(StatusCode, Json<Vec<Invitation>>)> {
    let created = workflow::invite(&db_pool, &user_id, family_id, body, ttl).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[debug_handler]
pub(crate) async fn pending(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<Vec<Invitation>>> {
    Ok(Json(workflow::pending_invitations(&db_pool, &user_id).await?))
}

#[debug_handler]
pub(crate) async fn respond(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(invitation_id): Path<Uuid>,
    Json(RespondBody { accept }): Json<RespondBody>,
) -> AppResult<Json<Invitation>> {
    Ok(Json(
        workflow::respond_to_invitation(&db_pool, &user_id, invitation_id, accept).await?,
    ))
}
