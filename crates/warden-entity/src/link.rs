//! Messenger link entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Binding between an identity and an out-of-band messenger account.
///
/// One link per identity. `last_verified_at` is stamped whenever an
/// approval session resolves to approved and feeds the approval cooldown
/// check.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessengerLink {
    /// The linked identity.
    pub player_id: Uuid,
    /// Numeric id of the messenger account.
    pub messenger_id: i64,
    /// Messenger username at link time, if available.
    pub messenger_username: Option<String>,
    /// When the link was established.
    pub linked_at: DateTime<Utc>,
    /// Last time an approval for this identity succeeded.
    pub last_verified_at: Option<DateTime<Utc>>,
}
