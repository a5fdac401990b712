//! Re-verification cooldown policy configuration.

use serde::{Deserialize, Serialize};

/// One cooldown rule.
///
/// `permission` selects the subjects the rule applies to; the first rule
/// whose tag the subject holds wins. An empty or missing tag never
/// matches. `minutes == 0` forces re-verification on every join and is
/// normalized to `always_require` when the policy is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownRuleConfig {
    /// Permission tag selecting subjects, e.g. `"warden.cooldown.vip"`.
    #[serde(default)]
    pub permission: Option<String>,
    /// Grace period length in minutes.
    #[serde(default)]
    pub minutes: u64,
    /// Scope the grace period to the verifying IP.
    #[serde(default)]
    pub per_ip: bool,
    /// Ignore any grace period; always require re-verification.
    #[serde(default)]
    pub always_require: bool,
}

/// Cooldown policy: ordered rules plus a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Whether the cooldown policy is in effect at all. A disabled policy
    /// resolves every subject to "always require".
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Rule applied when no listed rule matches.
    #[serde(default = "default_rule")]
    pub default: CooldownRuleConfig,
    /// Ordered rules; the first match by permission tag wins.
    #[serde(default)]
    pub rules: Vec<CooldownRuleConfig>,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default: default_rule(),
            rules: Vec::new(),
        }
    }
}

fn default_rule() -> CooldownRuleConfig {
    CooldownRuleConfig {
        permission: None,
        minutes: 0,
        per_ip: false,
        always_require: true,
    }
}

fn default_true() -> bool {
    true
}
