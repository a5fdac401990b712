//! Trusted device ledger.
//!
//! Long-lived trust records keyed by the exact (identity, ip, locale,
//! platform) tuple. Reads fail closed: any storage error is logged and
//! answered with "not trusted". Writes are best-effort; a failed
//! "remember" just means re-verification next time.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use warden_core::clock::Clock;
use warden_core::config::TrustedDeviceConfig;
use warden_core::traits::TrustedDeviceStore;
use warden_entity::DeviceFingerprint;

/// Remembers and checks trusted devices.
#[derive(Clone)]
pub struct TrustedDeviceLedger {
    store: Arc<dyn TrustedDeviceStore>,
    clock: Arc<dyn Clock>,
    config: TrustedDeviceConfig,
}

impl std::fmt::Debug for TrustedDeviceLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustedDeviceLedger")
            .field("config", &self.config)
            .finish()
    }
}

impl TrustedDeviceLedger {
    /// Creates a ledger over a persistent store.
    pub fn new(
        store: Arc<dyn TrustedDeviceStore>,
        clock: Arc<dyn Clock>,
        config: TrustedDeviceConfig,
    ) -> Self {
        Self { store, clock, config }
    }

    /// Whether the exact fingerprint is currently trusted for the
    /// identity.
    ///
    /// A hit stamps `last_used` best-effort off the calling path.
    pub async fn is_trusted(&self, player_id: Uuid, fingerprint: &DeviceFingerprint) -> bool {
        if !self.config.enabled {
            return false;
        }

        let record = match self.store.find(player_id, fingerprint).await {
            Ok(record) => record,
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "Trusted device lookup failed; treating as not trusted");
                return false;
            }
        };

        let Some(record) = record else {
            return false;
        };

        if !record.is_valid_at(self.clock.now()) {
            return false;
        }

        let store = self.store.clone();
        let record_id = record.id;
        tokio::spawn(async move {
            if let Err(e) = store.touch(record_id).await {
                warn!(record_id, error = %e, "Failed to stamp trusted device use");
            }
        });

        true
    }

    /// Remembers the device, extending its trust window.
    ///
    /// Write failures are logged and swallowed.
    pub async fn remember(&self, player_id: Uuid, fingerprint: &DeviceFingerprint) {
        if !self.config.enabled {
            return;
        }

        let trusted_until = self.clock.now() + Duration::days(self.config.expire_days as i64);
        match self.store.upsert(player_id, fingerprint, trusted_until).await {
            Ok(()) => {
                debug!(player_id = %player_id, ip = %fingerprint.ip, "Remembered trusted device");
            }
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "Failed to remember trusted device");
            }
        }
    }

    /// Forgets every device for the identity. Returns the number
    /// removed; a storage failure is logged and reported as zero.
    pub async fn forget(&self, player_id: Uuid) -> u64 {
        match self.store.delete_all(player_id).await {
            Ok(removed) => {
                debug!(player_id = %player_id, removed, "Forgot trusted devices");
                removed
            }
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "Failed to forget trusted devices");
                0
            }
        }
    }
}
