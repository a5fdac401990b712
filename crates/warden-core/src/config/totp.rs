//! TOTP code engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// TOTP parameters embedded in provisioning URIs and used for code
/// verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpConfig {
    /// Issuer label shown in authenticator apps.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Number of decimal digits per code.
    #[serde(default = "default_digits")]
    pub digits: u32,
    /// Time-step length in seconds.
    #[serde(default = "default_period")]
    pub period_seconds: u64,
    /// Number of adjacent time steps accepted on either side of "now".
    #[serde(default = "default_window")]
    pub window_steps: u32,
    /// Optional URL template for a QR rendering service; `{uri}` is
    /// replaced with the percent-encoded otpauth URI.
    #[serde(default)]
    pub qr_link_template: Option<String>,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            digits: default_digits(),
            period_seconds: default_period(),
            window_steps: default_window(),
            qr_link_template: None,
        }
    }
}

impl TotpConfig {
    /// Validate TOTP parameters.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(4..=9).contains(&self.digits) {
            return Err(AppError::configuration(format!(
                "totp.digits must be between 4 and 9, got {}",
                self.digits
            )));
        }
        if self.period_seconds == 0 {
            return Err(AppError::configuration("totp.period_seconds must be positive"));
        }
        if self.window_steps > 10 {
            return Err(AppError::configuration(format!(
                "totp.window_steps of {} would accept codes minutes away from now",
                self.window_steps
            )));
        }
        Ok(())
    }
}

fn default_issuer() -> String {
    "Warden".to_string()
}

fn default_digits() -> u32 {
    6
}

fn default_period() -> u64 {
    30
}

fn default_window() -> u32 {
    1
}
