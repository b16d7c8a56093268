use std::collections::BTreeSet;

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{
    begin_write,
    error::{is_unique_violation, CoreError, CoreResult},
    memorials::MemorialRef,
    now,
    privacy::{Action, PrivacyOverride},
};

use super::{model::AccessRequest, state::AccessRequestStatus};

/// Files a pending request for visibility into a memorial.
pub async fn request_access(
    db_pool: &SqlitePool,
    user_id: &str,
    memorial_id: Uuid,
    message: String,
) -> CoreResult<AccessRequest> {
    let mut tx = begin_write(db_pool).await?;
    MemorialRef::owner_and_privacy(&mut tx, memorial_id).await?;

    if AccessRequest::pending_exists(&mut tx, memorial_id, user_id).await? {
        return Err(CoreError::conflict("an access request is already pending"));
    }

    let created_at = now();
    let request = AccessRequest {
        id: Uuid::now_v7(),
        memorial_id,
        requester_id: user_id.to_owned(),
        message,
        status: AccessRequestStatus::Pending,
        created_at,
        updated_at: created_at,
    };
    match request.insert(&mut tx).await {
        Ok(()) => {}
        // a concurrent request won the partial unique index
        Err(err) if is_unique_violation(&err) => {
            return Err(CoreError::conflict("an access request is already pending"));
        }
        Err(err) => return Err(err.into()),
    }
    tx.commit().await?;

    info!(request_id = %request.id, %memorial_id, user_id, "access requested");
    Ok(request)
}

/// Approves or rejects a pending request. Only the memorial creator may decide.
///
/// Approval also grants the requester an explicit override for each scope in
/// `granted_scopes`.
pub async fn handle_access_request(
    db_pool: &SqlitePool,
    acting_user_id: &str,
    request_id: Uuid,
    approve: bool,
    granted_scopes: Vec<Action>,
) -> CoreResult<AccessRequest> {
    let mut tx = begin_write(db_pool).await?;
    let mut request = AccessRequest::find(&mut tx, request_id)
        .await?
        .ok_or(CoreError::NotFound("access request"))?;
    MemorialRef::require_owner(&mut tx, request.memorial_id, acting_user_id).await?;

    let next = request.status.resolve(approve)?;
    let at = now();
    if !AccessRequest::resolve(&mut tx, request.id, next, at).await? {
        return Err(CoreError::validation("access request is no longer pending"));
    }

    let scopes: BTreeSet<Action> = if approve {
        granted_scopes.into_iter().collect()
    } else {
        BTreeSet::new()
    };
    for &action in &scopes {
        PrivacyOverride::for_user(request.memorial_id, &request.requester_id, action, at)
            .insert(&mut tx)
            .await?;
    }
    tx.commit().await?;

    request.status = next;
    request.updated_at = at;
    info!(
        %request_id,
        memorial_id = %request.memorial_id,
        requester_id = %request.requester_id,
        status = next.as_str(),
        scopes = scopes.len(),
        "access request handled"
    );
    Ok(request)
}

/// Every request filed against the memorial, newest first. Creator only.
pub async fn list_access_requests(
    db_pool: &SqlitePool,
    owner_id: &str,
    memorial_id: Uuid,
) -> CoreResult<Vec<AccessRequest>> {
    let mut conn = db_pool.acquire().await?;
    MemorialRef::require_owner(&mut conn, memorial_id, owner_id).await?;
    Ok(AccessRequest::for_memorial(&mut conn, memorial_id).await?)
}
