//! Trusted device entity and the fingerprint that identifies one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The composite key identifying a device.
///
/// A device is defined by exact match on all three attributes; there is
/// no fuzzy or partial matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    /// Remote network address, as reported by the host.
    pub ip: String,
    /// Client locale, lowercased.
    pub locale: String,
    /// Client platform, as reported by the platform detector.
    pub platform: String,
}

impl DeviceFingerprint {
    /// Builds a fingerprint, normalizing the locale to lowercase.
    pub fn new(ip: impl Into<String>, locale: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            locale: locale.into().to_lowercase(),
            platform: platform.into(),
        }
    }
}

/// A long-lived trust record for one (identity, device) pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrustedDevice {
    /// Surrogate primary key.
    pub id: i64,
    /// The identity that trusted this device.
    pub player_id: Uuid,
    /// Remote network address at the time of trust.
    pub ip: String,
    /// Client locale at the time of trust.
    pub locale: String,
    /// Client platform at the time of trust.
    pub platform: String,
    /// Trust expires at this instant.
    pub trusted_until: DateTime<Utc>,
    /// When the record was first created.
    pub created_at: DateTime<Utc>,
    /// Last time this record satisfied a trust check.
    pub last_used: DateTime<Utc>,
}

impl TrustedDevice {
    /// Whether the trust window is still open at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.trusted_until > now
    }
}
