use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::{
    begin_write,
    access::AccessRequest,
    error::{is_unique_violation, CoreError, CoreResult},
    families::Family,
    memorials::{MemorialRef, PrivacyLevel},
    now,
};

use super::model::{Action, BlacklistEntry, PrivacyOverride};

/// Replacement privacy configuration for a memorial.
///
/// Every listed user and family receives an allow override for each listed action.
/// Previous overrides are dropped. When `blocked_user_ids` is present it replaces
/// the whole blacklist; a blocked user gets no override even if also listed as allowed.
#[derive(Debug, Clone, Deserialize)]
pub struct MemorialPrivacy {
    pub privacy_level: PrivacyLevel,
    #[serde(default)]
    pub allowed_user_ids: Vec<String>,
    #[serde(default)]
    pub allowed_family_ids: Vec<Uuid>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub blocked_user_ids: Option<Vec<String>>,
}

const SETTINGS_BLOCK_REASON: &str = "blocked in privacy settings";

fn user_set(ids: Vec<String>) -> BTreeSet<String> {
    ids.into_iter()
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct PrivacySettings {
    pub memorial: MemorialRef,
    pub overrides: Vec<PrivacyOverride>,
    pub blacklist: Vec<BlacklistEntry>,
    pub pending_requests: Vec<AccessRequest>,
}

pub async fn set_memorial_privacy(
    db_pool: &SqlitePool,
    owner_id: &str,
    memorial_id: Uuid,
    req: MemorialPrivacy,
) -> CoreResult<PrivacySettings> {
    let actions: BTreeSet<Action> = req.actions.into_iter().collect();
    let blocked = req.blocked_user_ids.map(user_set);
    let mut users = user_set(req.allowed_user_ids);
    if let Some(blocked) = &blocked {
        users.retain(|id| !blocked.contains(id));
    }
    let families: BTreeSet<Uuid> = req.allowed_family_ids.into_iter().collect();
    if actions.is_empty() && !(users.is_empty() && families.is_empty()) {
        return Err(CoreError::validation("allowed users or families need at least one action"));
    }

    let mut tx = begin_write(db_pool).await?;
    MemorialRef::require_owner(&mut tx, memorial_id, owner_id).await?;

    for &family_id in &families {
        if Family::find(&mut tx, family_id).await?.is_none() {
            return Err(CoreError::validation(format!("unknown family {family_id}")));
        }
    }

    MemorialRef::set_privacy_level(&mut tx, memorial_id, req.privacy_level).await?;
    PrivacyOverride::delete_for_memorial(&mut tx, memorial_id).await?;

    let created_at = now();
    if let Some(blocked) = &blocked {
        BlacklistEntry::delete_for_memorial(&mut tx, memorial_id).await?;
        for user_id in blocked {
            BlacklistEntry {
                memorial_id,
                user_id: user_id.clone(),
                reason: SETTINGS_BLOCK_REASON.to_owned(),
                created_at,
            }
            .insert(&mut tx)
            .await?;
        }
    }
    for &action in &actions {
        for user_id in &users {
            PrivacyOverride::for_user(memorial_id, user_id, action, created_at)
                .insert(&mut tx)
                .await?;
        }
        for &family_id in &families {
            PrivacyOverride::for_family(memorial_id, family_id, action, created_at)
                .insert(&mut tx)
                .await?;
        }
    }

    let settings = load(&mut tx, memorial_id).await?;
    tx.commit().await?;

    info!(
        %memorial_id,
        privacy_level = ?req.privacy_level,
        overrides = settings.overrides.len(),
        blacklisted = settings.blacklist.len(),
        "memorial privacy updated"
    );
    Ok(settings)
}

pub async fn get_privacy_settings(
    db_pool: &SqlitePool,
    owner_id: &str,
    memorial_id: Uuid,
) -> CoreResult<PrivacySettings> {
    let mut conn = db_pool.acquire().await?;
    MemorialRef::require_owner(&mut conn, memorial_id, owner_id).await?;
    load(&mut conn, memorial_id).await
}

async fn load(conn: &mut SqliteConnection, memorial_id: Uuid) -> CoreResult<PrivacySettings> {
    Ok(PrivacySettings {
        memorial: MemorialRef::owner_and_privacy(&mut *conn, memorial_id).await?,
        overrides: PrivacyOverride::for_memorial(&mut *conn, memorial_id).await?,
        blacklist: BlacklistEntry::for_memorial(&mut *conn, memorial_id).await?,
        pending_requests: AccessRequest::pending_for_memorial(&mut *conn, memorial_id).await?,
    })
}

/// Bars a user from the memorial regardless of any other grant, and drops the
/// overrides naming them.
pub async fn add_to_blacklist(
    db_pool: &SqlitePool,
    owner_id: &str,
    memorial_id: Uuid,
    user_id: &str,
    reason: String,
) -> CoreResult<BlacklistEntry> {
    let mut tx = begin_write(db_pool).await?;
    MemorialRef::require_owner(&mut tx, memorial_id, owner_id).await?;

    let entry = BlacklistEntry {
        memorial_id,
        user_id: user_id.to_owned(),
        reason,
        created_at: now(),
    };
    match entry.insert(&mut tx).await {
        Ok(()) => {}
        Err(err) if is_unique_violation(&err) => {
            return Err(CoreError::conflict("user is already blacklisted"));
        }
        Err(err) => return Err(err.into()),
    }
    let dropped = PrivacyOverride::delete_for_user(&mut tx, memorial_id, user_id).await?;
    tx.commit().await?;

    info!(%memorial_id, user_id, dropped, "user blacklisted");
    Ok(entry)
}

pub async fn remove_from_blacklist(
    db_pool: &SqlitePool,
    owner_id: &str,
    memorial_id: Uuid,
    user_id: &str,
) -> CoreResult<()> {
    let mut tx = begin_write(db_pool).await?;
    MemorialRef::require_owner(&mut tx, memorial_id, owner_id).await?;

    if BlacklistEntry::delete(&mut tx, memorial_id, user_id).await? == 0 {
        return Err(CoreError::NotFound("blacklist entry"));
    }
    tx.commit().await?;

    info!(%memorial_id, user_id, "user removed from blacklist");
    Ok(())
}
