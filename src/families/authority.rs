use serde::Serialize;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

use super::model::{Family, Membership, Role};

/// Effective authority inside a family circle, lowest to highest.
///
/// Creator is derived from `Family::creator_id` and layered above the stored role,
/// so it can never be granted or revoked through role changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    Member,
    Admin,
    Creator,
}

impl Authority {
    /// `None` when the user is neither the creator nor a member.
    pub fn derive(family: &Family, user_id: &str, role: Option<Role>) -> Option<Self> {
        if family.creator_id == user_id {
            return Some(Authority::Creator);
        }
        role.map(|role| match role {
            Role::Member => Authority::Member,
            Role::Admin => Authority::Admin,
        })
    }

    pub fn satisfies(self, required: Authority) -> bool {
        self >= required
    }

    /// The one place family authorization is decided.
    ///
    /// Fails `NotFound` for a missing or deleted family and `Forbidden` when the
    /// caller's authority is below `required`.
    pub(crate) async fn require(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        user_id: &str,
        required: Authority,
    ) -> CoreResult<(Family, Authority)> {
        let family = Family::find(&mut *conn, family_id)
            .await?
            .ok_or(CoreError::NotFound("family"))?;
        let role = Membership::find(&mut *conn, family_id, user_id)
            .await?
            .map(|m| m.role);

        match Authority::derive(&family, user_id, role) {
            Some(held) if held.satisfies(required) => Ok((family, held)),
            Some(held) => Err(CoreError::forbidden(format!(
                "requires {required:?} authority, caller holds {held:?}"
            ))),
            None => Err(CoreError::forbidden("not a member of this family")),
        }
    }
}
