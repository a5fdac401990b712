//! Gate policy configuration.

use serde::{Deserialize, Serialize};

/// Which subjects must verify and what they may do while pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Permission tag marking subjects that must hold a second factor.
    #[serde(default = "default_required_permission")]
    pub required_permission: String,
    /// Commands still allowed while verification is pending, with or
    /// without a leading slash.
    #[serde(default = "default_allowed_commands")]
    pub allow_commands_when_pending: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            required_permission: default_required_permission(),
            allow_commands_when_pending: default_allowed_commands(),
        }
    }
}

fn default_required_permission() -> String {
    "warden.required".to_string()
}

fn default_allowed_commands() -> Vec<String> {
    vec!["2fa".to_string()]
}
