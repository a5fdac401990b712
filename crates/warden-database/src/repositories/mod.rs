//! PostgreSQL-backed store implementations.

pub mod approval;
pub mod challenge;
pub mod credential;
pub mod link;
pub mod trusted_device;

pub use approval::ApprovalSessionRepository;
pub use challenge::ChallengeRepository;
pub use credential::UserCredentialRepository;
pub use link::MessengerLinkRepository;
pub use trusted_device::TrustedDeviceRepository;
