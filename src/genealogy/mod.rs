mod forest;
mod manager;
mod model;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{session::CurrentUser, AppResult, AppState};

pub use forest::Forest;
pub use manager::{create_node, delete_node, get_tree, update_node, CreateNode, UpdateNode};
pub use model::{Gender, GenealogyNode};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{family_id}/genealogy", get(tree).post(create))
        .route("/{family_id}/genealogy/{node_id}", put(update).delete(remove))
}

#[debug_handler]
async fn tree(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
) -> AppResult<Json<Forest>> {
    Ok(Json(get_tree(&db_pool, &user_id, family_id).await?))
}

#[debug_handler]
async fn create(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
    Json(body): Json<CreateNode>,
) -> AppResult<(StatusCode, Json<GenealogyNode>)> {
    let node = create_node(&db_pool, &user_id, family_id, body).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

#[debug_handler]
async fn update(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path((family_id, node_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateNode>,
) -> AppResult<Json<GenealogyNode>> {
    Ok(Json(update_node(&db_pool, &user_id, family_id, node_id, body).await?))
}

#[debug_handler]
async fn remove(
    State(db_pool): State<SqlitePool>,
    CurrentUser(user_id): CurrentUser,
    Path((family_id, node_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    delete_node(&db_pool, &user_id, family_id, node_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
