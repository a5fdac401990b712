//! Freeze hold composition.
//!
//! The TOTP gate and the out-of-band approval flow each place an
//! independent hold on an identity. The controller composes them: the
//! host's capability restrictions are applied when the first hold
//! appears and lifted only when the last one is released, so a subject
//! stays frozen until every path has cleared it.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use warden_core::traits::CapabilityControl;

/// Which verification path placed a hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldKind {
    /// Interactive TOTP verification is outstanding.
    Totp,
    /// Out-of-band approval is outstanding.
    OutOfBand,
}

/// Reference-counts freeze holds per identity.
#[derive(Clone)]
pub struct FreezeController {
    control: Arc<dyn CapabilityControl>,
    holds: Arc<DashMap<Uuid, HashSet<HoldKind>>>,
}

impl std::fmt::Debug for FreezeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreezeController").finish()
    }
}

impl FreezeController {
    /// Creates a controller with no holds.
    pub fn new(control: Arc<dyn CapabilityControl>) -> Self {
        Self {
            control,
            holds: Arc::new(DashMap::new()),
        }
    }

    /// Places a hold, freezing the subject if it is the first one.
    pub async fn hold(&self, player_id: Uuid, kind: HoldKind) {
        let first = {
            let mut entry = self.holds.entry(player_id).or_default();
            let was_empty = entry.is_empty();
            entry.insert(kind);
            was_empty
        };

        if first {
            debug!(player_id = %player_id, kind = ?kind, "Applying freeze");
            self.control.freeze(player_id).await;
        }
    }

    /// Releases a hold, unfreezing the subject if it was the last one.
    ///
    /// Releasing a hold that was never placed is a no-op.
    pub async fn release(&self, player_id: Uuid, kind: HoldKind) {
        let last = {
            let Some(mut entry) = self.holds.get_mut(&player_id) else {
                return;
            };
            entry.remove(&kind) && entry.is_empty()
        };

        if last {
            self.holds.remove_if(&player_id, |_, holds| holds.is_empty());
            debug!(player_id = %player_id, kind = ?kind, "Lifting freeze");
            self.control.unfreeze(player_id).await;
        }
    }

    /// Drops all holds without calling the host.
    ///
    /// Used when the subject has departed; there is nothing left to
    /// unfreeze.
    pub fn clear(&self, player_id: Uuid) {
        self.holds.remove(&player_id);
    }

    /// Whether any hold is outstanding for the identity.
    pub fn is_frozen(&self, player_id: Uuid) -> bool {
        self.holds
            .get(&player_id)
            .map(|holds| !holds.is_empty())
            .unwrap_or(false)
    }
}
