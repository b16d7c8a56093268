//! The single place memorial visibility is decided.
//!
//! Rules are checked in order and the first one that applies wins:
//!
//! 1. blacklisted for the memorial: deny, even for the creator
//! 2. memorial creator: allow
//! 3. memorial is public: allow
//! 4. member of a family the memorial is linked to: allow
//! 5. approved access request, or an explicit allow override for the action: allow
//! 6. otherwise deny
//!
//! Nothing here writes to the store.

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::{access::AccessRequest, error::CoreResult, memorials::{MemorialLink, MemorialRef}};

use super::model::{Action, BlacklistEntry, PrivacyOverride};

/// Which rule decided a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Blacklisted,
    Creator,
    Public,
    FamilyMember,
    ApprovedRequest,
    ExplicitGrant,
    Denied,
}

impl Verdict {
    pub fn allowed(self) -> bool {
        !matches!(self, Verdict::Blacklisted | Verdict::Denied)
    }
}

pub(crate) async fn evaluate(
    conn: &mut SqliteConnection,
    user_id: &str,
    memorial_id: Uuid,
    action: Action,
) -> CoreResult<Verdict> {
    let memorial = MemorialRef::owner_and_privacy(&mut *conn, memorial_id).await?;

    if BlacklistEntry::contains(&mut *conn, memorial_id, user_id).await? {
        return Ok(Verdict::Blacklisted);
    }
    if memorial.creator_id == user_id {
        return Ok(Verdict::Creator);
    }
    if memorial.privacy_level.is_most_permissive() {
        return Ok(Verdict::Public);
    }
    if MemorialLink::shared_with_member(&mut *conn, memorial_id, user_id).await? {
        return Ok(Verdict::FamilyMember);
    }
    if AccessRequest::approved_exists(&mut *conn, memorial_id, user_id).await? {
        return Ok(Verdict::ApprovedRequest);
    }
    if PrivacyOverride::grants(&mut *conn, memorial_id, user_id, action).await? {
        return Ok(Verdict::ExplicitGrant);
    }
    Ok(Verdict::Denied)
}

/// Decides a gate check and reports which rule applied.
pub async fn explain(
    db_pool: &SqlitePool,
    user_id: &str,
    memorial_id: Uuid,
    action: Action,
) -> CoreResult<Verdict> {
    let mut conn = db_pool.acquire().await?;
    let verdict = evaluate(&mut conn, user_id, memorial_id, action).await?;
    debug!(user_id, %memorial_id, %action, ?verdict, "privacy gate");
    Ok(verdict)
}

/// May `user_id` perform `action` on `memorial_id`? Fails `NotFound` for an unknown memorial.
pub async fn can_access(
    db_pool: &SqlitePool,
    user_id: &str,
    memorial_id: Uuid,
    action: Action,
) -> CoreResult<bool> {
    Ok(explain(db_pool, user_id, memorial_id, action).await?.allowed())
}
