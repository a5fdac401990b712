//! Trusted device ledger configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Trusted device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedDeviceConfig {
    /// Whether trusted devices are remembered and consulted at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How long a remembered device stays trusted, in days.
    #[serde(default = "default_expire_days")]
    pub expire_days: u64,
}

impl Default for TrustedDeviceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expire_days: default_expire_days(),
        }
    }
}

impl TrustedDeviceConfig {
    /// Validate trusted device settings.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.enabled && self.expire_days == 0 {
            return Err(AppError::configuration(
                "trusted_devices.expire_days must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_expire_days() -> u64 {
    30
}
