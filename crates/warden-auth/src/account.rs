//! Account flows: setup, confirmation, status, disable, and messenger
//! linking.
//!
//! Each method returns a typed outcome; user-facing messaging stays
//! with the host.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use warden_core::result::AppResult;
use warden_core::traits::{PlatformDetector, UserCredentialStore};
use warden_entity::{DeviceFingerprint, MessengerLink, Subject};

use crate::approval::{ApprovalFlow, IssuedChallenge};
use crate::cooldown::CooldownPolicy;
use crate::freeze::{FreezeController, HoldKind};
use crate::session::SessionTracker;
use crate::totp::TotpEngine;
use crate::trusted::TrustedDeviceLedger;
use crate::vault::SecretVault;

/// Everything the host needs to prompt the user through setup.
#[derive(Debug, Clone)]
pub struct SetupStart {
    /// The raw base32 secret, for manual entry.
    pub secret: String,
    /// The otpauth provisioning URI.
    pub provisioning_uri: String,
    /// A QR rendering link, if a template is configured.
    pub qr_link: Option<String>,
}

/// Outcome of submitting a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Setup completed; the second factor is now enforced.
    Enabled,
    /// An already-enabled identity re-verified successfully.
    Verified,
    /// The code did not match any step in the tolerance window.
    InvalidCode,
    /// No secret has been set up for the identity.
    NotConfigured,
}

/// Outcome of a code-gated disable request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableOutcome {
    /// The second factor was removed.
    Disabled,
    /// The code did not match; nothing changed.
    InvalidCode,
    /// The second factor was not enabled to begin with.
    NotEnabled,
}

/// Point-in-time account summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStatus {
    /// Whether the second factor is enforced.
    pub enabled: bool,
    /// Whether a verification window is currently open.
    pub verified: bool,
    /// Whether verification is pending.
    pub pending: bool,
    /// Whether a messenger link exists.
    pub linked: bool,
}

/// Host-facing account operations.
#[derive(Clone)]
pub struct AccountService {
    credentials: Arc<dyn UserCredentialStore>,
    vault: SecretVault,
    totp: TotpEngine,
    policy: CooldownPolicy,
    tracker: Arc<SessionTracker>,
    ledger: TrustedDeviceLedger,
    freeze: FreezeController,
    approval: ApprovalFlow,
    platform: Arc<dyn PlatformDetector>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService").finish()
    }
}

impl AccountService {
    /// Creates the account service over its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        credentials: Arc<dyn UserCredentialStore>,
        vault: SecretVault,
        totp: TotpEngine,
        policy: CooldownPolicy,
        tracker: Arc<SessionTracker>,
        ledger: TrustedDeviceLedger,
        freeze: FreezeController,
        approval: ApprovalFlow,
        platform: Arc<dyn PlatformDetector>,
    ) -> Self {
        Self {
            credentials,
            vault,
            totp,
            policy,
            tracker,
            ledger,
            freeze,
            approval,
            platform,
        }
    }

    /// Starts (or restarts) setup: generates a fresh secret, stores it
    /// protected but not yet enforced, and marks verification pending.
    pub async fn begin_setup(&self, subject: &Subject) -> AppResult<SetupStart> {
        let secret = self.totp.generate_secret();
        let blob = self.vault.protect(&secret);

        self.credentials
            .upsert_secret(subject.id, Some(blob), false)
            .await?;

        let rule = self.policy.resolve(subject);
        self.tracker
            .mark_pending(subject.id, Some(rule), subject.ip.clone());

        let provisioning_uri = self.totp.build_provisioning_uri(&subject.name, &secret);
        let qr_link = self.totp.build_qr_link(&provisioning_uri);

        info!(player_id = %subject.id, "Second-factor setup started");

        Ok(SetupStart {
            secret,
            provisioning_uri,
            qr_link,
        })
    }

    /// Submits a code, completing setup or re-verifying an enabled
    /// identity.
    ///
    /// On success the verification window opens, the device is
    /// remembered when the subject exposes a fingerprint, and the TOTP
    /// freeze hold is released.
    pub async fn confirm(&self, subject: &Subject, code: &str) -> AppResult<ConfirmOutcome> {
        let Some(blob) = self.credentials.get_secret(subject.id).await? else {
            return Ok(ConfirmOutcome::NotConfigured);
        };

        let secret = self.vault.reveal(&blob)?;
        if !self.totp.verify(&secret, code) {
            return Ok(ConfirmOutcome::InvalidCode);
        }

        let was_enabled = self.credentials.is_enabled(subject.id).await?;
        if !was_enabled {
            self.credentials.set_enabled(subject.id, true).await?;
        }

        self.tracker.mark_verified(subject.id, subject.ip.as_deref());
        self.remember_device(subject).await;
        self.freeze.release(subject.id, HoldKind::Totp).await;

        if was_enabled {
            info!(player_id = %subject.id, "Re-verification succeeded");
            Ok(ConfirmOutcome::Verified)
        } else {
            info!(player_id = %subject.id, "Second factor enabled");
            Ok(ConfirmOutcome::Enabled)
        }
    }

    /// Reports the account state for an identity.
    pub async fn status(&self, player_id: Uuid) -> AppResult<AccountStatus> {
        Ok(AccountStatus {
            enabled: self.credentials.is_enabled(player_id).await?,
            verified: self.tracker.is_verified(player_id),
            pending: self.tracker.is_pending(player_id),
            linked: self.approval.link_status(player_id).await?.is_some(),
        })
    }

    /// Disables the second factor, gated on a valid current code.
    ///
    /// Clears the stored secret and forgets every trusted device.
    pub async fn disable(&self, subject: &Subject, code: &str) -> AppResult<DisableOutcome> {
        if !self.credentials.is_enabled(subject.id).await? {
            return Ok(DisableOutcome::NotEnabled);
        }
        let Some(blob) = self.credentials.get_secret(subject.id).await? else {
            return Ok(DisableOutcome::NotEnabled);
        };

        let secret = self.vault.reveal(&blob)?;
        if !self.totp.verify(&secret, code) {
            return Ok(DisableOutcome::InvalidCode);
        }

        self.credentials.upsert_secret(subject.id, None, false).await?;
        self.ledger.forget(subject.id).await;

        info!(player_id = %subject.id, "Second factor disabled");
        Ok(DisableOutcome::Disabled)
    }

    /// Administratively removes the second factor without a code.
    ///
    /// Also drops the identity's in-memory session state.
    pub async fn force_disable(&self, player_id: Uuid) -> AppResult<()> {
        self.credentials.upsert_secret(player_id, None, false).await?;
        self.ledger.forget(player_id).await;
        self.tracker.clear(player_id);

        warn!(player_id = %player_id, "Second factor force-disabled");
        Ok(())
    }

    /// Starts messenger linking: issues a challenge and builds the
    /// deep link to hand to the user.
    pub async fn link(&self, subject: &Subject) -> AppResult<IssuedChallenge> {
        self.approval
            .issue_challenge(subject.id, Some(&subject.name))
            .await
    }

    /// The messenger link for an identity, if any.
    pub async fn link_status(&self, player_id: Uuid) -> AppResult<Option<MessengerLink>> {
        self.approval.link_status(player_id).await
    }

    /// Removes the messenger link.
    pub async fn unlink(&self, player_id: Uuid) -> AppResult<()> {
        self.approval.unlink(player_id).await
    }

    async fn remember_device(&self, subject: &Subject) {
        let (Some(ip), Some(locale)) = (&subject.ip, &subject.locale) else {
            return;
        };
        let fingerprint =
            DeviceFingerprint::new(ip.clone(), locale.clone(), self.platform.detect(subject.id));
        self.ledger.remember(subject.id, &fingerprint).await;
    }
}
