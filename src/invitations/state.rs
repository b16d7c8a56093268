use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationEvent {
    Accept,
    Decline,
    Expire,
}

impl InvitationStatus {
    pub fn is_terminal(self) -> bool {
        self != InvitationStatus::Pending
    }

    /// Status as callers must see it: a pending invitation past its expiry is expired
    /// whether or not the sweep has run.
    pub fn effective(self, expires_at: i64, now: i64) -> Self {
        match self {
            InvitationStatus::Pending if now >= expires_at => InvitationStatus::Expired,
            status => status,
        }
    }

    /// The only way an invitation changes state. Terminal states reject every event.
    pub fn transition(self, event: InvitationEvent) -> CoreResult<Self> {
        match (self, event) {
            (InvitationStatus::Pending, InvitationEvent::Accept) => Ok(InvitationStatus::Accepted),
            (InvitationStatus::Pending, InvitationEvent::Decline) => Ok(InvitationStatus::Declined),
            (InvitationStatus::Pending, InvitationEvent::Expire) => Ok(InvitationStatus::Expired),
            (status, _) => Err(CoreError::validation(format!(
                "invitation is already {}",
                status.as_str()
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
        }
    }
}
