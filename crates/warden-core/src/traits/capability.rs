//! Capability control seam.
//!
//! The engine decides *when* a subject's capabilities change; the host
//! environment implements *how* (movement, damage, chat, and command
//! restrictions, and the actual disconnect).

use async_trait::async_trait;
use uuid::Uuid;

/// Why a subject is being force-disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DisconnectReason {
    /// The companion channel denied the approval session.
    ApprovalDenied,
    /// No approval arrived before the deadline.
    ApprovalTimeout,
}

/// Host-implemented capability restrictions.
#[async_trait]
pub trait CapabilityControl: Send + Sync + 'static {
    /// Apply interaction restrictions to the subject.
    async fn freeze(&self, player_id: Uuid);

    /// Lift interaction restrictions from the subject.
    async fn unfreeze(&self, player_id: Uuid);

    /// Force-disconnect the subject. Must be a no-op if the subject has
    /// already departed.
    async fn disconnect(&self, player_id: Uuid, reason: DisconnectReason);

    /// Whether the subject is still connected.
    async fn is_connected(&self, player_id: Uuid) -> bool;
}
