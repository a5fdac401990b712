//! Secret vault configuration and master key resolution.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Secret vault settings.
///
/// The master key is resolved env-var-first, then the inline base64
/// value. If neither yields a usable key the vault runs in tagged
/// plaintext mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Environment variable consulted for the base64 master key.
    #[serde(default = "default_key_env")]
    pub master_key_env: String,
    /// Inline base64 master key, used when the env var is unset.
    #[serde(default)]
    pub master_key_b64: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            master_key_env: default_key_env(),
            master_key_b64: String::new(),
        }
    }
}

impl VaultConfig {
    /// Resolve the master key bytes, if any.
    ///
    /// A malformed base64 value degrades to no key (plaintext mode) with
    /// a warning rather than refusing to start; secrets written in this
    /// state remain readable.
    pub fn resolve_master_key(&self) -> Option<Vec<u8>> {
        let b64 = match std::env::var(&self.master_key_env) {
            Ok(value) if !value.is_empty() => value,
            _ => self.master_key_b64.clone(),
        };

        if b64.is_empty() {
            warn!("No secret encryption key configured; secrets will be stored in plaintext");
            return None;
        }

        match BASE64.decode(b64.as_bytes()) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "Malformed base64 master key; secrets will be stored in plaintext");
                None
            }
        }
    }
}

fn default_key_env() -> String {
    "WARDEN_MASTER_KEY".to_string()
}
