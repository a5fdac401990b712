//! One-shot link challenge entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A time-boxed, single-use token binding an identity to an out-of-band
/// linking attempt.
///
/// Keyed by token; consumed (deleted) once the companion channel resolves
/// it. An expired challenge is indistinguishable from one that never
/// existed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Challenge {
    /// 16-character uppercase alphanumeric token.
    pub token: String,
    /// The identity that requested the link.
    pub player_id: Uuid,
    /// Display name at issuance time, if known.
    pub player_name: Option<String>,
    /// The challenge is invalid after this instant.
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    /// Whether the challenge is still valid at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
