//! Persistent user credential store.

use async_trait::async_trait;
use uuid::Uuid;

use warden_entity::SecretBlob;

use crate::result::AppResult;

/// Persistence seam for per-identity second-factor credentials.
///
/// The secret column always holds a tagged [`SecretBlob`]; the store never
/// interprets it.
#[async_trait]
pub trait UserCredentialStore: Send + Sync + 'static {
    /// Whether the second factor is enforced for the identity.
    async fn is_enabled(&self, player_id: Uuid) -> AppResult<bool>;

    /// The protected secret, if one has been set up.
    async fn get_secret(&self, player_id: Uuid) -> AppResult<Option<SecretBlob>>;

    /// Insert or replace the credential row wholesale.
    ///
    /// `secret = None` clears the stored secret (disable flow).
    async fn upsert_secret(
        &self,
        player_id: Uuid,
        secret: Option<SecretBlob>,
        enabled: bool,
    ) -> AppResult<()>;

    /// Flip the enforcement flag without touching the secret.
    async fn set_enabled(&self, player_id: Uuid, enabled: bool) -> AppResult<()>;
}
