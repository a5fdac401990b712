//! Interaction gate.
//!
//! Explicit entry points the host calls on each relevant occurrence
//! (join, quit, chat, command, move, damage). Decisions are returned,
//! never enforced here; the host applies them.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use warden_core::config::GateConfig;
use warden_core::traits::{PlatformDetector, UserCredentialStore};
use warden_entity::{DeviceFingerprint, Subject};

use crate::approval::{ApprovalFlow, JoinApproval};
use crate::cooldown::CooldownPolicy;
use crate::freeze::{FreezeController, HoldKind};
use crate::session::SessionTracker;
use crate::trusted::TrustedDeviceLedger;

/// Whether an event may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the event through.
    Allow,
    /// Suppress the event.
    Deny,
}

/// How the interactive verification path handled a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinVerification {
    /// The second factor does not apply to this subject.
    NotRequired,
    /// The subject should hold a second factor but has none; the host
    /// may prompt, but nothing is frozen.
    SetupSuggested,
    /// A trusted device matched; verification skipped.
    TrustedDevice,
    /// The cooldown grace period is still open; verification skipped.
    CooldownHit,
    /// A verification window from earlier is still open.
    AlreadyVerified,
    /// The subject is frozen until it submits a valid code.
    VerificationRequired,
}

/// Both join paths combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinDecision {
    /// Outcome of the interactive TOTP path.
    pub verification: JoinVerification,
    /// Outcome of the out-of-band approval path.
    pub approval: JoinApproval,
}

/// Decides what a subject may do at each host event.
#[derive(Clone)]
pub struct Gate {
    credentials: Arc<dyn UserCredentialStore>,
    policy: CooldownPolicy,
    tracker: Arc<SessionTracker>,
    ledger: TrustedDeviceLedger,
    freeze: FreezeController,
    approval: ApprovalFlow,
    platform: Arc<dyn PlatformDetector>,
    config: GateConfig,
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate").field("config", &self.config).finish()
    }
}

impl Gate {
    /// Creates the gate over its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        credentials: Arc<dyn UserCredentialStore>,
        policy: CooldownPolicy,
        tracker: Arc<SessionTracker>,
        ledger: TrustedDeviceLedger,
        freeze: FreezeController,
        approval: ApprovalFlow,
        platform: Arc<dyn PlatformDetector>,
        config: GateConfig,
    ) -> Self {
        Self {
            credentials,
            policy,
            tracker,
            ledger,
            freeze,
            approval,
            platform,
            config,
        }
    }

    /// Runs both verification paths for a joining subject.
    ///
    /// A credential read failure fails closed: the subject is treated
    /// as enabled and must verify once storage recovers.
    pub async fn on_join(&self, subject: &Subject) -> JoinDecision {
        let verification = self.join_verification(subject).await;
        let approval = self.approval.on_join(subject).await;
        JoinDecision {
            verification,
            approval,
        }
    }

    /// Drops per-session state for a departed subject.
    ///
    /// Cooldown records survive so the subject can skip verification
    /// when it rejoins inside the grace period.
    pub fn on_quit(&self, player_id: Uuid) {
        self.approval.on_disconnect(player_id);
        self.freeze.clear(player_id);
        self.tracker.end_session(player_id);
    }

    /// Whether the subject may chat.
    pub fn on_chat(&self, player_id: Uuid) -> GateDecision {
        self.frozen_decision(player_id)
    }

    /// Whether the subject may run a command.
    ///
    /// Frozen subjects may still run whitelisted commands so they can
    /// complete verification.
    pub fn on_command(&self, player_id: Uuid, command_line: &str) -> GateDecision {
        if !self.freeze.is_frozen(player_id) {
            return GateDecision::Allow;
        }

        let name = command_name(command_line);
        let allowed = self
            .config
            .allow_commands_when_pending
            .iter()
            .any(|entry| entry.trim_start_matches('/').eq_ignore_ascii_case(name));

        if allowed {
            GateDecision::Allow
        } else {
            GateDecision::Deny
        }
    }

    /// Whether the subject may move.
    pub fn on_move(&self, player_id: Uuid) -> GateDecision {
        self.frozen_decision(player_id)
    }

    /// Whether the subject may take or deal damage.
    pub fn on_damage(&self, player_id: Uuid) -> GateDecision {
        self.frozen_decision(player_id)
    }

    async fn join_verification(&self, subject: &Subject) -> JoinVerification {
        if !subject.has_permission(&self.config.required_permission) {
            return JoinVerification::NotRequired;
        }

        let enabled = match self.credentials.is_enabled(subject.id).await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(player_id = %subject.id, error = %e, "Credential read failed; requiring verification");
                true
            }
        };

        if !enabled {
            return JoinVerification::SetupSuggested;
        }

        if let Some(fingerprint) = self.fingerprint(subject) {
            if self.ledger.is_trusted(subject.id, &fingerprint).await {
                self.tracker.mark_trusted(subject.id);
                return JoinVerification::TrustedDevice;
            }
        }

        let rule = self.policy.resolve(subject);
        if self
            .tracker
            .is_within_cooldown(subject.id, subject.ip.as_deref(), rule)
        {
            self.tracker.mark_trusted(subject.id);
            return JoinVerification::CooldownHit;
        }

        if self.tracker.is_verified(subject.id) {
            return JoinVerification::AlreadyVerified;
        }

        self.tracker
            .mark_pending(subject.id, Some(rule), subject.ip.clone());
        self.freeze.hold(subject.id, HoldKind::Totp).await;
        JoinVerification::VerificationRequired
    }

    fn frozen_decision(&self, player_id: Uuid) -> GateDecision {
        if self.freeze.is_frozen(player_id) {
            GateDecision::Deny
        } else {
            GateDecision::Allow
        }
    }

    fn fingerprint(&self, subject: &Subject) -> Option<DeviceFingerprint> {
        let ip = subject.ip.as_ref()?;
        let locale = subject.locale.as_ref()?;
        Some(DeviceFingerprint::new(
            ip.clone(),
            locale.clone(),
            self.platform.detect(subject.id),
        ))
    }
}

/// Extracts the bare command name from a raw command line.
fn command_name(command_line: &str) -> &str {
    command_line
        .trim_start()
        .trim_start_matches('/')
        .split_whitespace()
        .next()
        .unwrap_or("")
}
