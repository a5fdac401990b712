//! Secret vault.
//!
//! Wraps TOTP secrets in authenticated encryption at rest. With no
//! master key configured the vault degrades to tagged plaintext;
//! protection never fails, but revealing an encrypted blob without the
//! key is a hard configuration error.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use tracing::warn;

use warden_core::config::VaultConfig;
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_entity::SecretBlob;

/// AES-GCM nonce length in bytes (96 bits).
const IV_LEN: usize = 12;

/// AES-256 key length in bytes.
const KEY_LEN: usize = 32;

/// Protects and reveals secret blobs.
#[derive(Clone)]
pub struct SecretVault {
    cipher: Option<Aes256Gcm>,
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVault")
            .field("encrypted", &self.cipher.is_some())
            .finish()
    }
}

impl SecretVault {
    /// Creates a vault from an optional master key.
    ///
    /// A key of the wrong length degrades to plaintext mode with a
    /// warning; refusing to start would make existing secrets
    /// unreachable for no gain.
    pub fn new(master_key: Option<Vec<u8>>) -> Self {
        let cipher = match master_key {
            Some(key) if key.len() == KEY_LEN => {
                Some(Aes256Gcm::new_from_slice(&key).expect("key length checked"))
            }
            Some(key) => {
                warn!(
                    key_len = key.len(),
                    "Master key is not {KEY_LEN} bytes; secrets will be stored in plaintext"
                );
                None
            }
            None => None,
        };
        Self { cipher }
    }

    /// Creates a vault from configuration, resolving the master key
    /// env-var-first.
    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.resolve_master_key())
    }

    /// Whether blobs will be encrypted at rest.
    pub fn is_encrypting(&self) -> bool {
        self.cipher.is_some()
    }

    /// Protects a plaintext secret for storage.
    ///
    /// Never fails: with no key, or on any encryption failure, the
    /// secret is stored tagged plaintext and a warning is logged.
    pub fn protect(&self, plaintext: &str) -> SecretBlob {
        let cipher = match &self.cipher {
            Some(cipher) => cipher,
            None => return tag_plain(plaintext),
        };

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        match cipher.encrypt(Nonce::from_slice(&iv), plaintext.as_bytes()) {
            Ok(ciphertext) => {
                let mut payload = Vec::with_capacity(IV_LEN + ciphertext.len());
                payload.extend_from_slice(&iv);
                payload.extend_from_slice(&ciphertext);

                let mut blob = SecretBlob::TAG_ENCRYPTED.as_bytes().to_vec();
                blob.extend_from_slice(BASE64.encode(&payload).as_bytes());
                SecretBlob::new(blob)
            }
            Err(_) => {
                warn!("Secret encryption failed; storing plaintext");
                tag_plain(plaintext)
            }
        }
    }

    /// Reveals a stored blob.
    ///
    /// Dispatches on the blob's tag. An encrypted blob without a
    /// configured key cannot be recovered and surfaces as a
    /// configuration error; an untagged blob is legacy plaintext.
    pub fn reveal(&self, blob: &SecretBlob) -> AppResult<String> {
        if blob.is_plaintext() {
            let raw = &blob.as_bytes()[SecretBlob::TAG_PLAIN.len()..];
            return decode_utf8(raw);
        }

        if !blob.is_encrypted() {
            return decode_utf8(blob.as_bytes());
        }

        let cipher = self.cipher.as_ref().ok_or_else(|| {
            AppError::configuration(
                "Stored secret is encrypted but no master key is configured",
            )
        })?;

        let encoded = &blob.as_bytes()[SecretBlob::TAG_ENCRYPTED.len()..];
        let payload = BASE64
            .decode(encoded)
            .map_err(|e| AppError::crypto(format!("Malformed encrypted secret: {e}")))?;

        if payload.len() <= IV_LEN {
            return Err(AppError::crypto("Encrypted secret is too short"));
        }
        let (iv, ciphertext) = payload.split_at(IV_LEN);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| AppError::crypto("Secret decryption failed"))?;

        decode_utf8(&plaintext)
    }
}

fn tag_plain(plaintext: &str) -> SecretBlob {
    let mut blob = SecretBlob::TAG_PLAIN.as_bytes().to_vec();
    blob.extend_from_slice(plaintext.as_bytes());
    SecretBlob::new(blob)
}

fn decode_utf8(bytes: &[u8]) -> AppResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| AppError::crypto(format!("Stored secret is not valid UTF-8: {e}")))
}
