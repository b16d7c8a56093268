use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AccessRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl AccessRequestStatus {
    /// Resolves a pending request. Resolved requests are never reopened.
    pub fn resolve(self, approve: bool) -> CoreResult<Self> {
        match (self, approve) {
            (AccessRequestStatus::Pending, true) => Ok(AccessRequestStatus::Approved),
            (AccessRequestStatus::Pending, false) => Ok(AccessRequestStatus::Rejected),
            (status, _) => Err(CoreError::validation(format!(
                "access request is already {}",
                status.as_str()
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessRequestStatus::Pending => "pending",
            AccessRequestStatus::Approved => "approved",
            AccessRequestStatus::Rejected => "rejected",
        }
    }
}
