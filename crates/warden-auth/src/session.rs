//! In-memory session tracker.
//!
//! The authoritative per-process answer to "is this identity currently
//! verified", "is verification pending", and "is it inside its cooldown
//! grace period". All state is volatile; a restart requires everyone to
//! re-verify.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use warden_core::clock::Clock;
use warden_core::config::SessionConfig;

use crate::cooldown::{CooldownPolicy, CooldownRule};

/// Verification awaiting completion for one identity.
#[derive(Debug, Clone)]
struct PendingState {
    rule: CooldownRule,
    ip: Option<String>,
}

/// Concurrent per-process verification state.
///
/// Expired entries are evicted lazily on read; correctness never
/// depends on prompt eviction.
#[derive(Debug)]
pub struct SessionTracker {
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    policy: CooldownPolicy,
    verified_until: DashMap<Uuid, DateTime<Utc>>,
    pending: DashMap<Uuid, PendingState>,
    cooldown_global: DashMap<Uuid, DateTime<Utc>>,
    cooldown_per_ip: DashMap<Uuid, HashMap<String, DateTime<Utc>>>,
}

impl SessionTracker {
    /// Creates a tracker with empty state.
    pub fn new(config: &SessionConfig, policy: CooldownPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            session_ttl: Duration::minutes(config.expire_minutes as i64),
            policy,
            verified_until: DashMap::new(),
            pending: DashMap::new(),
            cooldown_global: DashMap::new(),
            cooldown_per_ip: DashMap::new(),
        }
    }

    /// Records that verification is pending for the identity.
    ///
    /// Idempotent; a repeated call overwrites the previous pending
    /// state.
    pub fn mark_pending(&self, player_id: Uuid, rule: Option<CooldownRule>, ip: Option<String>) {
        let rule = rule.unwrap_or_else(|| self.policy.default_rule());
        self.pending.insert(player_id, PendingState { rule, ip });
    }

    /// Whether verification is pending for the identity.
    pub fn is_pending(&self, player_id: Uuid) -> bool {
        self.pending.contains_key(&player_id)
    }

    /// Marks the identity verified after interactive verification.
    ///
    /// Consumes any pending rule and IP, extends the verification
    /// window, and writes a cooldown record in the scope the rule
    /// demands. An "always require" rule writes nothing and purges any
    /// stale record instead.
    pub fn mark_verified(&self, player_id: Uuid, ip: Option<&str>) {
        let now = self.clock.now();
        let pending = self.pending.remove(&player_id).map(|(_, state)| state);

        let rule = pending
            .as_ref()
            .map(|state| state.rule)
            .unwrap_or_else(|| self.policy.default_rule());
        let ip = ip
            .map(str::to_owned)
            .or_else(|| pending.and_then(|state| state.ip));

        self.verified_until.insert(player_id, now + self.session_ttl);

        if rule.always_require {
            self.cooldown_global.remove(&player_id);
            self.cooldown_per_ip.remove(&player_id);
            return;
        }

        let expires_at = now + rule.grace_period();
        match (rule.per_ip, ip) {
            (true, Some(ip)) => {
                self.cooldown_per_ip
                    .entry(player_id)
                    .or_default()
                    .insert(ip, expires_at);
            }
            _ => {
                self.cooldown_global.insert(player_id, expires_at);
            }
        }

        debug!(player_id = %player_id, "Marked verified");
    }

    /// Extends the verification window without touching cooldown
    /// bookkeeping.
    ///
    /// Used when a trusted device or a cooldown hit bypassed
    /// interactive verification.
    pub fn mark_trusted(&self, player_id: Uuid) {
        let now = self.clock.now();
        self.pending.remove(&player_id);
        self.verified_until.insert(player_id, now + self.session_ttl);
    }

    /// Whether a non-expired verification window exists.
    pub fn is_verified(&self, player_id: Uuid) -> bool {
        let now = self.clock.now();
        // Copy the deadline out first: `remove_if` takes the shard write
        // lock, so the read guard must not be alive across it.
        let until = self.verified_until.get(&player_id).map(|entry| *entry);
        match until {
            Some(until) if until > now => true,
            Some(_) => {
                self.verified_until
                    .remove_if(&player_id, |_, until| *until <= now);
                false
            }
            None => false,
        }
    }

    /// Whether the identity is inside its cooldown grace period under
    /// the given rule.
    pub fn is_within_cooldown(&self, player_id: Uuid, ip: Option<&str>, rule: CooldownRule) -> bool {
        if rule.always_require {
            return false;
        }
        let now = self.clock.now();

        if rule.per_ip {
            let Some(ip) = ip else {
                return false;
            };
            let Some(mut entry) = self.cooldown_per_ip.get_mut(&player_id) else {
                return false;
            };
            match entry.get(ip) {
                Some(expires) if *expires > now => true,
                Some(_) => {
                    entry.remove(ip);
                    false
                }
                None => false,
            }
        } else {
            // Same guard discipline as `is_verified`: release the read
            // guard before evicting.
            let expires = self.cooldown_global.get(&player_id).map(|entry| *entry);
            match expires {
                Some(expires) if expires > now => true,
                Some(_) => {
                    self.cooldown_global
                        .remove_if(&player_id, |_, expires| *expires <= now);
                    false
                }
                None => false,
            }
        }
    }

    /// Drops the verification window and pending state at session end.
    ///
    /// Cooldown records deliberately survive; they exist to let the
    /// identity skip re-verification on its next join.
    pub fn end_session(&self, player_id: Uuid) {
        self.verified_until.remove(&player_id);
        self.pending.remove(&player_id);
    }

    /// Drops all in-memory state for the identity, cooldown records
    /// included. Used on force-disable.
    pub fn clear(&self, player_id: Uuid) {
        self.verified_until.remove(&player_id);
        self.pending.remove(&player_id);
        self.cooldown_global.remove(&player_id);
        self.cooldown_per_ip.remove(&player_id);
    }
}
