//! Out-of-band approval flow configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Out-of-band approval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Whether linked identities must be approved on join.
    #[serde(default = "default_true")]
    pub require_on_join: bool,
    /// Username of the companion bot, without the leading `@`.
    #[serde(default = "default_bot_username")]
    pub bot_username: String,
    /// Deep-link template; `{bot}` and `{token}` are substituted.
    #[serde(default = "default_link_template")]
    pub link_template: String,
    /// Link challenge lifetime in seconds.
    #[serde(default = "default_challenge_ttl")]
    pub challenge_ttl_seconds: u64,
    /// Seconds a frozen subject may wait for approval before being
    /// disconnected.
    #[serde(default = "default_kick_after")]
    pub kick_after_seconds: u64,
    /// An approval within this many minutes pre-approves the next join.
    /// Zero disables the shortcut.
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,
    /// How often the local poller checks for a resolution, in
    /// milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            require_on_join: true,
            bot_username: default_bot_username(),
            link_template: default_link_template(),
            challenge_ttl_seconds: default_challenge_ttl(),
            kick_after_seconds: default_kick_after(),
            cooldown_minutes: default_cooldown_minutes(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl ApprovalConfig {
    /// Validate approval flow settings.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.link_template.contains("{token}") {
            return Err(AppError::configuration(
                "approval.link_template must contain a {token} placeholder",
            ));
        }
        if self.kick_after_seconds == 0 {
            return Err(AppError::configuration(
                "approval.kick_after_seconds must be positive",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::configuration(
                "approval.poll_interval_ms must be positive",
            ));
        }
        Ok(())
    }

    /// Build the deep-link URL for a challenge token.
    pub fn deep_link(&self, token: &str) -> String {
        self.link_template
            .replace("{bot}", &self.bot_username)
            .replace("{token}", token)
    }
}

fn default_true() -> bool {
    true
}

fn default_bot_username() -> String {
    "WardenAuthBot".to_string()
}

fn default_link_template() -> String {
    "https://t.me/{bot}?start={token}".to_string()
}

fn default_challenge_ttl() -> u64 {
    600
}

fn default_kick_after() -> u64 {
    120
}

fn default_cooldown_minutes() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    500
}
