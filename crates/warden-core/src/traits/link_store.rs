//! Persistent messenger link store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use warden_entity::MessengerLink;

use crate::result::AppResult;

/// Persistence seam for identity-to-messenger bindings.
#[async_trait]
pub trait MessengerLinkStore: Send + Sync + 'static {
    /// The link for an identity, if one exists.
    async fn find(&self, player_id: Uuid) -> AppResult<Option<MessengerLink>>;

    /// Insert or replace the link for an identity.
    async fn upsert(
        &self,
        player_id: Uuid,
        messenger_id: i64,
        username: Option<&str>,
    ) -> AppResult<()>;

    /// Stamp `last_verified_at`, feeding the approval cooldown.
    async fn touch_verified(&self, player_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Remove the link for an identity.
    async fn delete(&self, player_id: Uuid) -> AppResult<()>;
}
