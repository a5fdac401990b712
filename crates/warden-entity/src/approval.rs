//! Out-of-band approval session entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Resolution state of an approval session.
///
/// Transitions `Pending -> Approved` or `Pending -> Denied` exactly once.
/// Timeout is not a stored state; it is observed by the local poller when
/// a `Pending` record outlives its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    /// Waiting for the companion channel to resolve.
    Pending,
    /// The companion channel approved the session.
    Approved,
    /// The companion channel denied the session.
    Denied,
}

impl ApprovalStatus {
    /// Whether the status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Denied => write!(f, "DENIED"),
        }
    }
}

/// One out-of-band approval attempt for an identity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApprovalSession {
    /// Surrogate primary key.
    pub id: i64,
    /// The identity awaiting approval.
    pub player_id: Uuid,
    /// When the session was opened.
    pub created_at: DateTime<Utc>,
    /// A `Pending` record past this instant is a timeout.
    pub expires_at: DateTime<Utc>,
    /// Current resolution state.
    pub status: ApprovalStatus,
    /// When the session was approved, if it was.
    pub approved_at: Option<DateTime<Utc>>,
    /// Remote address of the joining session, if known.
    pub ip: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!ApprovalStatus::Pending.is_terminal());
        assert!(ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Denied.is_terminal());
    }
}
