//! Warden authentication trust engine.
//!
//! The engine decides whether a connected identity may interact: it
//! verifies TOTP codes, protects secrets at rest, tracks verification
//! state with expiry, evaluates the re-verification cooldown policy,
//! remembers trusted devices, and drives the out-of-band approval flow.
//! The host environment supplies persistence, capability restrictions,
//! and event delivery through the seams in `warden-core`.

pub mod account;
pub mod approval;
pub mod cooldown;
pub mod freeze;
pub mod gate;
pub mod session;
pub mod totp;
pub mod trusted;
pub mod vault;

pub use account::AccountService;
pub use approval::ApprovalFlow;
pub use cooldown::CooldownPolicy;
pub use freeze::FreezeController;
pub use gate::Gate;
pub use session::SessionTracker;
pub use totp::TotpEngine;
pub use trusted::TrustedDeviceLedger;
pub use vault::SecretVault;
