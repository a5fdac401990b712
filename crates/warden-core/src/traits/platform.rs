//! Platform detection seam.
//!
//! Which implementation is wired in is decided once at startup; the
//! engine never probes for optional host plugins at call time.

use uuid::Uuid;

/// Resolves the client platform for a connected identity.
pub trait PlatformDetector: Send + Sync + 'static {
    /// A short platform label, e.g. `"java"` or `"bedrock"`.
    fn detect(&self, player_id: Uuid) -> String;
}

/// Default detector for hosts without platform information.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPlatformDetector;

impl PlatformDetector for NoopPlatformDetector {
    fn detect(&self, _player_id: Uuid) -> String {
        "unknown".to_string()
    }
}
