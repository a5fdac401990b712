//! Re-verification cooldown policy.
//!
//! A declarative rule set mapping a subject's permission tags to a
//! cooldown duration and scope. The policy only interprets rules; the
//! session tracker owns the cooldown records themselves.

use chrono::Duration;

use warden_core::config::{CooldownConfig, CooldownRuleConfig};
use warden_entity::Subject;

/// A resolved cooldown rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownRule {
    /// Grace period length in minutes.
    pub minutes: u64,
    /// Scope the grace period to the verifying IP.
    pub per_ip: bool,
    /// Ignore any grace period; always require re-verification.
    pub always_require: bool,
}

impl CooldownRule {
    /// The rule that never grants a grace period.
    pub const ALWAYS_REQUIRE: Self = Self {
        minutes: 0,
        per_ip: false,
        always_require: true,
    };

    /// The grace period as a duration.
    pub fn grace_period(&self) -> Duration {
        Duration::minutes(self.minutes as i64)
    }
}

/// One policy entry: a permission tag guarding a rule.
#[derive(Debug, Clone)]
struct PolicyEntry {
    permission: String,
    rule: CooldownRule,
}

/// Ordered cooldown rules plus a default, built once from validated
/// configuration.
#[derive(Debug, Clone)]
pub struct CooldownPolicy {
    entries: Vec<PolicyEntry>,
    default_rule: CooldownRule,
}

impl CooldownPolicy {
    /// Builds a policy from configuration.
    ///
    /// Rules with `minutes == 0` are normalized to `always_require` here
    /// so evaluation never has to reinterpret them. Entries without a
    /// permission tag can never match and are dropped. A disabled policy
    /// resolves every subject to "always require".
    pub fn from_config(config: &CooldownConfig) -> Self {
        if !config.enabled {
            return Self {
                entries: Vec::new(),
                default_rule: CooldownRule::ALWAYS_REQUIRE,
            };
        }

        let entries = config
            .rules
            .iter()
            .filter_map(|rule| {
                let permission = rule.permission.clone()?;
                if permission.is_empty() {
                    return None;
                }
                Some(PolicyEntry {
                    permission,
                    rule: normalize(rule),
                })
            })
            .collect();

        Self {
            entries,
            default_rule: normalize(&config.default),
        }
    }

    /// Resolves the rule for a subject: first match by permission tag
    /// wins, else the default.
    pub fn resolve(&self, subject: &Subject) -> CooldownRule {
        self.entries
            .iter()
            .find(|entry| subject.has_permission(&entry.permission))
            .map(|entry| entry.rule)
            .unwrap_or(self.default_rule)
    }

    /// The rule applied when no listed rule matches.
    pub fn default_rule(&self) -> CooldownRule {
        self.default_rule
    }
}

fn normalize(config: &CooldownRuleConfig) -> CooldownRule {
    CooldownRule {
        minutes: config.minutes,
        per_ip: config.per_ip,
        always_require: config.always_require || config.minutes == 0,
    }
}
