//! Approval flow state machine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use warden_core::clock::Clock;
use warden_core::config::ApprovalConfig;
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::{
    ApprovalSessionStore, CapabilityControl, ChallengeStore, MessengerLinkStore,
};
use warden_entity::{Challenge, MessengerLink, Subject};

use crate::freeze::{FreezeController, HoldKind};

use super::watcher::{self, WatcherContext, WatcherHandle};

/// Alphabet for challenge tokens.
const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Challenge token length in characters.
const TOKEN_LEN: usize = 16;

/// A freshly issued link challenge.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    /// The one-shot token the companion channel must present.
    pub token: String,
    /// Deep link the user opens to hand the token to the bot.
    pub deep_link: String,
    /// The challenge is dead after this instant.
    pub expires_at: DateTime<Utc>,
}

/// Outcome of the approval check on join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinApproval {
    /// No messenger link exists (or the flow is disabled); nothing to
    /// approve.
    NotRequired,
    /// A recent approval is still inside the cooldown window.
    PreApproved,
    /// An approval session was opened and the subject is held frozen.
    Pending,
}

/// Drives challenge issuance and the approval state machine.
///
/// `resolve_challenge`, `mark_approved`, and `mark_denied` form the
/// seam the companion channel's transport calls into; everything else
/// faces the host.
#[derive(Clone)]
pub struct ApprovalFlow {
    challenges: Arc<dyn ChallengeStore>,
    sessions: Arc<dyn ApprovalSessionStore>,
    links: Arc<dyn MessengerLinkStore>,
    control: Arc<dyn CapabilityControl>,
    freeze: FreezeController,
    clock: Arc<dyn Clock>,
    config: ApprovalConfig,
    watchers: Arc<DashMap<Uuid, WatcherHandle>>,
    watcher_generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for ApprovalFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalFlow")
            .field("config", &self.config)
            .finish()
    }
}

impl ApprovalFlow {
    /// Creates an approval flow over its collaborators.
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        sessions: Arc<dyn ApprovalSessionStore>,
        links: Arc<dyn MessengerLinkStore>,
        control: Arc<dyn CapabilityControl>,
        freeze: FreezeController,
        clock: Arc<dyn Clock>,
        config: ApprovalConfig,
    ) -> Self {
        Self {
            challenges,
            sessions,
            links,
            control,
            freeze,
            clock,
            config,
            watchers: Arc::new(DashMap::new()),
            watcher_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Issues a link challenge for an identity that is not yet linked.
    ///
    /// Fails fast with a conflict when a link already exists; at most
    /// one active challenge per identity is expected at a time.
    pub async fn issue_challenge(
        &self,
        player_id: Uuid,
        player_name: Option<&str>,
    ) -> AppResult<IssuedChallenge> {
        if self.links.find(player_id).await?.is_some() {
            return Err(AppError::conflict("Identity is already linked"));
        }

        let token = generate_token();
        let expires_at =
            self.clock.now() + Duration::seconds(self.config.challenge_ttl_seconds as i64);

        self.challenges
            .create(&Challenge {
                token: token.clone(),
                player_id,
                player_name: player_name.map(str::to_owned),
                expires_at,
            })
            .await?;

        debug!(player_id = %player_id, "Issued link challenge");

        Ok(IssuedChallenge {
            deep_link: self.config.deep_link(&token),
            token,
            expires_at,
        })
    }

    /// Consumes a challenge token exactly once.
    ///
    /// An expired or unknown token is reported as absent; a second call
    /// with the same token finds nothing.
    pub async fn resolve_challenge(&self, token: &str) -> AppResult<Option<Challenge>> {
        let challenge = self
            .challenges
            .find_valid_by_token(token, self.clock.now())
            .await?;

        let Some(challenge) = challenge else {
            return Ok(None);
        };

        self.challenges.delete(token).await?;
        Ok(Some(challenge))
    }

    /// Resolves a challenge and binds the identity to a messenger
    /// account.
    ///
    /// Returns the consumed challenge, or `None` when the token is
    /// unknown or expired.
    pub async fn complete_link(
        &self,
        token: &str,
        messenger_id: i64,
        username: Option<&str>,
    ) -> AppResult<Option<Challenge>> {
        let Some(challenge) = self.resolve_challenge(token).await? else {
            return Ok(None);
        };

        self.links
            .upsert(challenge.player_id, messenger_id, username)
            .await?;

        info!(player_id = %challenge.player_id, "Messenger link established");
        Ok(Some(challenge))
    }

    /// The messenger link for an identity, if any.
    pub async fn link_status(&self, player_id: Uuid) -> AppResult<Option<MessengerLink>> {
        self.links.find(player_id).await
    }

    /// Removes the messenger link for an identity.
    pub async fn unlink(&self, player_id: Uuid) -> AppResult<()> {
        self.links.delete(player_id).await
    }

    /// Runs the approval check for a joining subject.
    ///
    /// A linked identity outside its approval cooldown gets a PENDING
    /// session, an out-of-band freeze hold, and a watcher that polls
    /// for the resolution while racing the kick-after timeout. Storage
    /// errors reading the link are logged and skip the flow; there is
    /// no messenger to ask without one.
    pub async fn on_join(&self, subject: &Subject) -> JoinApproval {
        if !self.config.require_on_join {
            return JoinApproval::NotRequired;
        }

        let link = match self.links.find(subject.id).await {
            Ok(link) => link,
            Err(e) => {
                warn!(player_id = %subject.id, error = %e, "Link lookup failed; skipping approval flow");
                return JoinApproval::NotRequired;
            }
        };

        let Some(link) = link else {
            return JoinApproval::NotRequired;
        };

        let now = self.clock.now();
        if self.config.cooldown_minutes > 0 {
            let window = Duration::minutes(self.config.cooldown_minutes as i64);
            if let Some(last) = link.last_verified_at {
                if now - last < window {
                    debug!(player_id = %subject.id, "Approval cooldown hit; pre-approved");
                    return JoinApproval::PreApproved;
                }
            }
        }

        let expires_at = now + Duration::seconds(self.config.kick_after_seconds as i64);
        if let Err(e) = self
            .sessions
            .create_pending(subject.id, expires_at, subject.ip.as_deref())
            .await
        {
            warn!(player_id = %subject.id, error = %e, "Failed to open approval session; skipping approval flow");
            return JoinApproval::NotRequired;
        }

        self.freeze.hold(subject.id, HoldKind::OutOfBand).await;

        // A leftover watcher from an earlier join is stopped before the
        // replacement is registered; its cleanup can only evict an entry
        // of its own generation, never the new one.
        if let Some((_, previous)) = self.watchers.remove(&subject.id) {
            let _ = previous.cancel.send(());
        }

        let generation = self.watcher_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = watcher::spawn(
            WatcherContext {
                sessions: self.sessions.clone(),
                control: self.control.clone(),
                freeze: self.freeze.clone(),
                watchers: self.watchers.clone(),
                config: self.config.clone(),
            },
            subject.id,
            generation,
        );
        self.watchers
            .insert(subject.id, WatcherHandle { generation, cancel });

        info!(player_id = %subject.id, "Approval session opened; awaiting resolution");
        JoinApproval::Pending
    }

    /// Records an external approval and stamps the link's verification
    /// time for the cooldown shortcut.
    pub async fn mark_approved(&self, player_id: Uuid) -> AppResult<()> {
        let now = self.clock.now();
        self.sessions.mark_approved(player_id, now).await?;

        if let Err(e) = self.links.touch_verified(player_id, now).await {
            warn!(player_id = %player_id, error = %e, "Failed to stamp link verification time");
        }

        Ok(())
    }

    /// Records an external denial.
    pub async fn mark_denied(&self, player_id: Uuid) -> AppResult<()> {
        self.sessions.mark_denied(player_id).await
    }

    /// Runs a cleanup cycle over unclaimed challenges.
    ///
    /// Expired tokens are already invisible to reads; this reaps the
    /// rows. Returns the number removed.
    pub async fn purge_expired_challenges(&self) -> AppResult<u64> {
        let purged = self.challenges.purge_expired(self.clock.now()).await?;
        if purged > 0 {
            debug!(count = purged, "Purged expired link challenges");
        }
        Ok(purged)
    }

    /// Stops any watcher for a departed subject.
    pub fn on_disconnect(&self, player_id: Uuid) {
        if let Some((_, handle)) = self.watchers.remove(&player_id) {
            let _ = handle.cancel.send(());
        }
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}
