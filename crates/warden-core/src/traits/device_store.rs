//! Persistent trusted device store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use warden_entity::{DeviceFingerprint, TrustedDevice};

use crate::result::AppResult;

/// Persistence seam for trusted device records.
///
/// Records are unique per (identity, ip, locale, platform); the store
/// treats the fingerprint as an opaque composite key.
#[async_trait]
pub trait TrustedDeviceStore: Send + Sync + 'static {
    /// Look up the record matching the exact fingerprint tuple.
    async fn find(
        &self,
        player_id: Uuid,
        fingerprint: &DeviceFingerprint,
    ) -> AppResult<Option<TrustedDevice>>;

    /// Insert or refresh a record, extending `trusted_until`.
    async fn upsert(
        &self,
        player_id: Uuid,
        fingerprint: &DeviceFingerprint,
        trusted_until: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Update `last_used` on a record.
    async fn touch(&self, id: i64) -> AppResult<()>;

    /// Delete every record for the identity. Returns the number removed.
    async fn delete_all(&self, player_id: Uuid) -> AppResult<u64>;
}
