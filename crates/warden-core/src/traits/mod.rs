//! Collaborator traits consumed by the trust engine.
//!
//! The engine never talks to storage, the host environment, or the
//! platform layer directly; everything crosses one of these seams so that
//! tests can substitute in-memory doubles.

pub mod approval_store;
pub mod capability;
pub mod challenge_store;
pub mod credential_store;
pub mod device_store;
pub mod link_store;
pub mod platform;

pub use approval_store::ApprovalSessionStore;
pub use capability::{CapabilityControl, DisconnectReason};
pub use challenge_store::ChallengeStore;
pub use credential_store::UserCredentialStore;
pub use device_store::TrustedDeviceStore;
pub use link_store::MessengerLinkStore;
pub use platform::{NoopPlatformDetector, PlatformDetector};
