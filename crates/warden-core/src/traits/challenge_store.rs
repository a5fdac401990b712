//! Persistent link challenge store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_entity::Challenge;

use crate::result::AppResult;

/// Persistence seam for one-shot link challenges.
#[async_trait]
pub trait ChallengeStore: Send + Sync + 'static {
    /// Store a freshly issued challenge.
    async fn create(&self, challenge: &Challenge) -> AppResult<()>;

    /// Find a challenge by token that is still valid at `now`.
    ///
    /// An expired token is reported as absent, indistinguishable from one
    /// that never existed.
    async fn find_valid_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Challenge>>;

    /// Delete a challenge by token.
    async fn delete(&self, token: &str) -> AppResult<()>;

    /// Delete every challenge that expired before `now`.
    ///
    /// Returns the number removed. Unclaimed challenges are only ever
    /// reaped here; reads ignore them but never delete them.
    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
