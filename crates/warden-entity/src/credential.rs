//! User credential entity and the protected secret blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A protected TOTP secret at rest.
///
/// The blob carries its own encoding tag: `PLA:` for plaintext (no master
/// key configured) and `ENC:` for AES-GCM ciphertext. An untagged blob is
/// a legacy record and is read as plaintext. The blob is replaced
/// wholesale, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct SecretBlob(Vec<u8>);

impl SecretBlob {
    /// Tag prefix for plaintext blobs.
    pub const TAG_PLAIN: &'static str = "PLA:";
    /// Tag prefix for encrypted blobs.
    pub const TAG_ENCRYPTED: &'static str = "ENC:";

    /// Wraps raw stored bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw stored bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the blob, returning the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Whether the blob carries the plaintext tag.
    pub fn is_plaintext(&self) -> bool {
        self.0.starts_with(Self::TAG_PLAIN.as_bytes())
    }

    /// Whether the blob carries the encrypted tag.
    pub fn is_encrypted(&self) -> bool {
        self.0.starts_with(Self::TAG_ENCRYPTED.as_bytes())
    }
}

impl From<Vec<u8>> for SecretBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Per-identity second-factor credential.
///
/// Created on first setup, the secret is replaced on re-setup and cleared
/// (secret = NULL, enabled = false) on disable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserCredential {
    /// The identity this credential belongs to.
    pub player_id: Uuid,
    /// Whether the second factor is enforced for this identity.
    pub enabled: bool,
    /// The protected TOTP secret, if one has been set up.
    pub secret: Option<SecretBlob>,
    /// When the credential row was first created.
    pub created_at: DateTime<Utc>,
}
