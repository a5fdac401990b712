//! In-memory session tracking configuration.

use serde::{Deserialize, Serialize};

/// Session tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a successful verification stays valid, in minutes.
    #[serde(default = "default_expire_minutes")]
    pub expire_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expire_minutes: default_expire_minutes(),
        }
    }
}

fn default_expire_minutes() -> u64 {
    120
}
