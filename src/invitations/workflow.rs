use std::collections::BTreeSet;

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    begin_write,
    error::{CoreError, CoreResult},
    families::{join_content, Activity, ActivityKind, Authority, Family, Membership},
    now,
};

use super::{
    model::Invitation,
    state::{InvitationEvent, InvitationStatus},
};

#[derive(Debug, Clone, Deserialize)]
pub struct InviteMembers {
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub message: String,
}

/// Issues one pending invitation per invitee.
///
/// Invitees who are already members, or who already hold a live pending invitation
/// to this family, are skipped. Returns the invitations actually created.
pub async fn invite(
    db_pool: &SqlitePool,
    inviter_id: &str,
    family_id: Uuid,
    InviteMembers { user_ids, message }: InviteMembers,
    ttl: time::Duration,
) -> CoreResult<Vec<Invitation>> {
    let invitees: BTreeSet<String> = user_ids
        .into_iter()
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
        .collect();
    if invitees.is_empty() {
        return Err(CoreError::validation("no invitees given"));
    }

    let mut tx = begin_write(db_pool).await?;
    Authority::require(&mut tx, family_id, inviter_id, Authority::Admin).await?;

    let created_at = now();
    let expires_at = created_at + ttl.whole_seconds();
    let mut created = Vec::with_capacity(invitees.len());
    for invitee_id in invitees {
        if Membership::find(&mut tx, family_id, &invitee_id).await?.is_some() {
            debug!(%family_id, invitee_id, "already a member, not inviting");
            continue;
        }
        if Invitation::live_pending_exists(&mut tx, family_id, &invitee_id, created_at).await? {
            debug!(%family_id, invitee_id, "already invited, not inviting again");
            continue;
        }

        let invitation = Invitation {
            id: Uuid::now_v7(),
            family_id,
            inviter_id: inviter_id.to_owned(),
            invitee_id,
            status: InvitationStatus::Pending,
            message: message.clone(),
            expires_at,
            created_at,
            updated_at: created_at,
        };
        invitation.insert(&mut tx).await?;
        created.push(invitation);
    }
    tx.commit().await?;

    info!(%family_id, inviter_id, count = created.len(), "invitations issued");
    Ok(created)
}

/// Accepts or declines an invitation addressed to `user_id`.
///
/// Accepting moves the invitation to `accepted` and inserts the membership in one
/// transaction; an existing membership is left as is.
pub async fn respond_to_invitation(
    db_pool: &SqlitePool,
    user_id: &str,
    invitation_id: Uuid,
    accept: bool,
) -> CoreResult<Invitation> {
    let mut tx = begin_write(db_pool).await?;
    let mut invitation = Invitation::find(&mut tx, invitation_id)
        .await?
        .ok_or(CoreError::NotFound("invitation"))?;

    if invitation.invitee_id != user_id {
        return Err(CoreError::forbidden("invitation is addressed to someone else"));
    }

    let at = now();
    let event = if accept {
        InvitationEvent::Accept
    } else {
        InvitationEvent::Decline
    };
    let next = invitation.effective_status(at).transition(event)?;

    if accept && Family::find(&mut tx, invitation.family_id).await?.is_none() {
        return Err(CoreError::NotFound("family"));
    }
    if !Invitation::advance(&mut tx, invitation.id, next, at).await? {
        return Err(CoreError::validation("invitation is no longer pending"));
    }
    if accept {
        let joined = Membership::insert_if_absent(&mut tx, invitation.family_id, user_id, at).await?;
        if joined {
            Activity::record(
                &mut tx,
                invitation.family_id,
                user_id,
                None,
                ActivityKind::Join,
                join_content(Some(invitation.id)),
            )
            .await?;
        } else {
            debug!(family_id = %invitation.family_id, user_id, "invitee was already a member");
        }
    }
    tx.commit().await?;

    invitation.status = next;
    invitation.updated_at = at;
    info!(
        invitation_id = %invitation.id,
        family_id = %invitation.family_id,
        user_id,
        status = next.as_str(),
        "invitation answered"
    );
    Ok(invitation)
}

pub async fn pending_invitations(db_pool: &SqlitePool, user_id: &str) -> CoreResult<Vec<Invitation>> {
    let mut conn = db_pool.acquire().await?;
    Ok(Invitation::live_pending_for_invitee(&mut conn, user_id, now()).await?)
}

/// Applies the `expired` transition to every pending invitation whose expiry has
/// passed at `at`. Run by the external sweep; returns how many were expired.
pub async fn expire_stale_invitations(db_pool: &SqlitePool, at: i64) -> CoreResult<u64> {
    let mut conn = db_pool.acquire().await?;
    let expired = Invitation::expire_overdue(&mut conn, at).await?;
    if expired > 0 {
        info!(expired, "stale invitations expired");
    }
    Ok(expired)
}
