//! Persistent approval session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use warden_entity::ApprovalStatus;

use crate::result::AppResult;

/// Persistence seam for out-of-band approval sessions.
///
/// The stored records are the source of truth for cross-process
/// visibility: the local poller only reads, and external resolution is
/// the only writer of terminal statuses.
#[async_trait]
pub trait ApprovalSessionStore: Send + Sync + 'static {
    /// Open a new PENDING record. Returns the session id.
    async fn create_pending(
        &self,
        player_id: Uuid,
        expires_at: DateTime<Utc>,
        ip: Option<&str>,
    ) -> AppResult<i64>;

    /// Status of the most recent record for the identity, if any.
    async fn latest_status(&self, player_id: Uuid) -> AppResult<Option<ApprovalStatus>>;

    /// Resolve the most recent PENDING record to APPROVED.
    ///
    /// A no-op when no PENDING record exists; terminal records are never
    /// overridden.
    async fn mark_approved(&self, player_id: Uuid, approved_at: DateTime<Utc>) -> AppResult<()>;

    /// Resolve the most recent PENDING record to DENIED.
    ///
    /// Same idempotence contract as [`mark_approved`].
    ///
    /// [`mark_approved`]: ApprovalSessionStore::mark_approved
    async fn mark_denied(&self, player_id: Uuid) -> AppResult<()>;
}
