use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    begin_write,
    error::{is_unique_violation, CoreError, CoreResult},
    invitations::Invitation,
    memorials::MemorialLink,
    now,
};

use super::{
    activity::{join_content, Activity, ActivityKind},
    authority::Authority,
    model::{Family, Membership, Role},
};

const INVITE_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const INVITE_CODE_LEN: usize = 8;
const INVITE_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFamily {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFamily {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A membership row together with the authority it confers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    pub user_id: String,
    pub role: Role,
    pub authority: Authority,
    pub joined_at: i64,
}

fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_CODE_CHARSET[rng.random_range(0..INVITE_CODE_CHARSET.len())] as char)
        .collect()
}

pub async fn create_family(
    db_pool: &SqlitePool,
    creator_id: &str,
    CreateFamily { name, description }: CreateFamily,
) -> CoreResult<Family> {
    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(CoreError::validation("family name must not be empty"));
    }

    let created_at = now();
    let mut family = Family {
        id: Uuid::now_v7(),
        name,
        description,
        creator_id: creator_id.to_owned(),
        invite_code: String::new(),
        created_at,
        updated_at: created_at,
    };

    let mut tx = begin_write(db_pool).await?;

    let mut attempts = 0;
    loop {
        family.invite_code = generate_invite_code();
        match family.insert(&mut tx).await {
            Ok(()) => break,
            Err(err) if is_unique_violation(&err) => {
                attempts += 1;
                debug!(attempts, "invite code collision, regenerating");
                if attempts >= INVITE_CODE_ATTEMPTS {
                    return Err(CoreError::conflict("could not allocate a unique invite code"));
                }
            }
            Err(err) => return Err(err.into()),
        }
    }

    Membership::insert(&mut tx, family.id, creator_id, Role::Member, created_at).await?;
    tx.commit().await?;

    info!(family_id = %family.id, creator_id, "family created");
    Ok(family)
}

pub async fn get_family(db_pool: &SqlitePool, user_id: &str, family_id: Uuid) -> CoreResult<Family> {
    let mut conn = db_pool.acquire().await?;
    let (family, _) = Authority::require(&mut conn, family_id, user_id, Authority::Member).await?;
    Ok(family)
}

pub async fn list_families(db_pool: &SqlitePool, user_id: &str) -> CoreResult<Vec<Family>> {
    let mut conn = db_pool.acquire().await?;
    Ok(Family::for_user(&mut conn, user_id).await?)
}

pub async fn update_family(
    db_pool: &SqlitePool,
    acting_user_id: &str,
    family_id: Uuid,
    UpdateFamily { name, description }: UpdateFamily,
) -> CoreResult<Family> {
    let mut tx = begin_write(db_pool).await?;
    let (mut family, _) =
        Authority::require(&mut tx, family_id, acting_user_id, Authority::Admin).await?;

    if let Some(name) = name {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("family name must not be empty"));
        }
        family.name = name.to_owned();
    }
    if let Some(description) = description {
        family.description = description;
    }
    family.updated_at = now();
    family.update_details(&mut tx).await?;
    tx.commit().await?;

    Ok(family)
}

/// Soft-deletes the family and invalidates everything hanging off it.
pub async fn delete_family(db_pool: &SqlitePool, acting_user_id: &str, family_id: Uuid) -> CoreResult<()> {
    let mut tx = begin_write(db_pool).await?;
    Authority::require(&mut tx, family_id, acting_user_id, Authority::Creator).await?;

    let at = now();
    Family::soft_delete(&mut tx, family_id, at).await?;
    let members = Membership::delete_all(&mut tx, family_id).await?;
    let invitations = Invitation::expire_pending_for_family(&mut tx, family_id, at).await?;
    MemorialLink::delete_for_family(&mut tx, family_id).await?;
    tx.commit().await?;

    info!(%family_id, members, invitations, "family deleted");
    Ok(())
}

pub async fn join_by_code(db_pool: &SqlitePool, user_id: &str, invite_code: &str) -> CoreResult<Family> {
    let mut tx = begin_write(db_pool).await?;
    let family = Family::find_by_code(&mut tx, invite_code.trim())
        .await?
        .ok_or(CoreError::NotFound("family"))?;

    if Membership::find(&mut tx, family.id, user_id).await?.is_some() {
        return Err(CoreError::conflict("already a member of this family"));
    }

    // the primary key on (family_id, user_id) settles concurrent joins
    match Membership::insert(&mut tx, family.id, user_id, Role::Member, now()).await {
        Ok(()) => {}
        Err(err) if is_unique_violation(&err) => {
            return Err(CoreError::conflict("already a member of this family"));
        }
        Err(err) => return Err(err.into()),
    }
    Activity::record(
        &mut tx,
        family.id,
        user_id,
        None,
        ActivityKind::Join,
        join_content(None),
    )
    .await?;
    tx.commit().await?;

    info!(family_id = %family.id, user_id, "joined by invite code");
    Ok(family)
}

pub async fn remove_member(
    db_pool: &SqlitePool,
    acting_user_id: &str,
    family_id: Uuid,
    member_id: &str,
) -> CoreResult<()> {
    let mut tx = begin_write(db_pool).await?;
    let (family, _) = Authority::require(&mut tx, family_id, acting_user_id, Authority::Admin).await?;

    if family.creator_id == member_id {
        return Err(CoreError::forbidden("the family creator cannot be removed"));
    }
    if Membership::delete(&mut tx, family_id, member_id).await? == 0 {
        return Err(CoreError::NotFound("member"));
    }
    Activity::record(
        &mut tx,
        family_id,
        acting_user_id,
        None,
        ActivityKind::RemoveMember,
        json!({ "removed_user_id": member_id }),
    )
    .await?;
    tx.commit().await?;

    info!(%family_id, member_id, acting_user_id, "member removed");
    Ok(())
}

pub async fn leave_family(db_pool: &SqlitePool, user_id: &str, family_id: Uuid) -> CoreResult<()> {
    let mut tx = begin_write(db_pool).await?;
    let family = Family::find(&mut tx, family_id)
        .await?
        .ok_or(CoreError::NotFound("family"))?;

    if family.creator_id == user_id {
        return Err(CoreError::forbidden(
            "the family creator cannot leave; delete the family instead",
        ));
    }
    if Membership::delete(&mut tx, family_id, user_id).await? == 0 {
        return Err(CoreError::NotFound("member"));
    }
    Activity::record(&mut tx, family_id, user_id, None, ActivityKind::Leave, json!({})).await?;
    tx.commit().await?;

    info!(%family_id, user_id, "member left");
    Ok(())
}

pub async fn set_member_role(
    db_pool: &SqlitePool,
    acting_user_id: &str,
    family_id: Uuid,
    member_id: &str,
    role: &str,
) -> CoreResult<()> {
    let mut tx = begin_write(db_pool).await?;
    let (family, _) =
        Authority::require(&mut tx, family_id, acting_user_id, Authority::Creator).await?;

    if family.creator_id == member_id {
        return Err(CoreError::forbidden("the creator's authority is not a settable role"));
    }
    let role: Role = role.parse()?;
    if Membership::set_role(&mut tx, family_id, member_id, role).await? == 0 {
        return Err(CoreError::NotFound("member"));
    }
    Activity::record(
        &mut tx,
        family_id,
        acting_user_id,
        None,
        ActivityKind::SetRole,
        json!({ "target_user_id": member_id, "new_role": role }),
    )
    .await?;
    tx.commit().await?;

    info!(%family_id, member_id, %role, "member role changed");
    Ok(())
}

pub async fn list_members(db_pool: &SqlitePool, user_id: &str, family_id: Uuid) -> CoreResult<Vec<MemberView>> {
    let mut conn = db_pool.acquire().await?;
    let (family, _) = Authority::require(&mut conn, family_id, user_id, Authority::Member).await?;

    let members = Membership::list(&mut conn, family_id).await?;
    Ok(members
        .into_iter()
        .filter_map(|m| {
            let authority = Authority::derive(&family, &m.user_id, Some(m.role))?;
            Some(MemberView {
                user_id: m.user_id,
                role: m.role,
                authority,
                joined_at: m.joined_at,
            })
        })
        .collect())
}
